//! Generative-content call sites for interviews and quizzes.
//!
//! Each function builds its prompt, goes through `generate_json_or` (or the
//! plain-text variant) and declares the fallback used when generation fails.

use serde::Deserialize;
use tracing::warn;

use crate::interview::prompts::{
    fill_template, FEEDBACK_PROMPT_TEMPLATE, IMPROVEMENT_TIP_PROMPT_TEMPLATE, QUIZ_PROMPT_TEMPLATE,
    VOICE_QUESTIONS_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, PLAIN_TEXT_SYSTEM};
use crate::llm_client::{generate_json_or, generate_text_or_none, TextGenerator};
use crate::models::assessment::{
    InterviewQuestion, QuestionFeedback, QuestionResult, QuizQuestion, TranscriptMessage,
    VoiceFeedback,
};

pub const VOICE_QUESTION_COUNT: usize = 5;
pub const QUIZ_QUESTION_COUNT: usize = 10;
pub const QUIZ_OPTION_COUNT: usize = 4;

#[derive(Debug, Deserialize)]
struct QuestionsEnvelope<T> {
    questions: Vec<T>,
}

// ────────────────────────────────────────────────────────────────────────────
// Voice interview questions
// ────────────────────────────────────────────────────────────────────────────

pub fn fallback_interview_questions(topic: &str) -> Vec<InterviewQuestion> {
    vec![
        InterviewQuestion {
            question: format!("Tell me about your experience with {topic}?"),
            follow_up: "Can you give a specific example?".to_string(),
        },
        InterviewQuestion {
            question: "What is a project you are proud of?".to_string(),
            follow_up: "What was the biggest challenge?".to_string(),
        },
    ]
}

pub async fn generate_interview_questions(
    llm: &dyn TextGenerator,
    topic: &str,
    level: &str,
    previous_questions: &[String],
) -> Vec<InterviewQuestion> {
    let previous = if previous_questions.is_empty() {
        "none".to_string()
    } else {
        previous_questions.join(", ")
    };
    let count = VOICE_QUESTION_COUNT.to_string();
    let prompt = fill_template(
        VOICE_QUESTIONS_PROMPT_TEMPLATE,
        &[
            ("count", count.as_str()),
            ("level", level),
            ("topic", topic),
            ("previous_questions", previous.as_str()),
        ],
    );

    generate_json_or(
        llm,
        &prompt,
        JSON_ONLY_SYSTEM,
        "interview questions",
        || QuestionsEnvelope {
            questions: fallback_interview_questions(topic),
        },
    )
    .await
    .questions
}

// ────────────────────────────────────────────────────────────────────────────
// Transcript feedback
// ────────────────────────────────────────────────────────────────────────────

pub fn fallback_feedback() -> VoiceFeedback {
    VoiceFeedback {
        total_score: 7.5,
        final_assessment: "Good effort! You provided solid answers but could be more specific \
            with your examples. (AI analysis fallback)"
            .to_string(),
        individual_feedback: vec![QuestionFeedback {
            question: "Transcript was unclear or empty".to_string(),
            answer: "N/A".to_string(),
            feedback: "AI analysis failed or transcript was empty.".to_string(),
            score: 0.0,
        }],
    }
}

/// Renders a transcript as `role: message` lines.
pub fn render_transcript(transcript: &[TranscriptMessage]) -> String {
    transcript
        .iter()
        .map(|m| format!("{}: {}", m.role, m.message))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn generate_feedback(
    llm: &dyn TextGenerator,
    transcript: &[TranscriptMessage],
) -> VoiceFeedback {
    let transcript_text = render_transcript(transcript);
    if transcript_text.trim().is_empty() {
        warn!("Transcript is empty, using fallback feedback");
        return fallback_feedback();
    }

    let prompt = fill_template(
        FEEDBACK_PROMPT_TEMPLATE,
        &[("transcript", transcript_text.as_str())],
    );
    generate_json_or(
        llm,
        &prompt,
        JSON_ONLY_SYSTEM,
        "interview feedback",
        fallback_feedback,
    )
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Quiz
// ────────────────────────────────────────────────────────────────────────────

/// Generates multiple-choice questions. Falls back to an empty list, and drops
/// questions whose correct answer is not one of their options.
pub async fn generate_quiz_questions(
    llm: &dyn TextGenerator,
    industry: &str,
    skills: &[String],
) -> Vec<QuizQuestion> {
    let skills_clause = if skills.is_empty() {
        String::new()
    } else {
        format!(" with expertise in {}", skills.join(", "))
    };
    let count = QUIZ_QUESTION_COUNT.to_string();
    let options = QUIZ_OPTION_COUNT.to_string();
    let prompt = fill_template(
        QUIZ_PROMPT_TEMPLATE,
        &[
            ("count", count.as_str()),
            ("options", options.as_str()),
            ("industry", industry),
            ("skills_clause", skills_clause.as_str()),
        ],
    );

    let generated: QuestionsEnvelope<QuizQuestion> = generate_json_or(
        llm,
        &prompt,
        JSON_ONLY_SYSTEM,
        "quiz questions",
        || QuestionsEnvelope { questions: vec![] },
    )
    .await;

    let total = generated.questions.len();
    let questions: Vec<QuizQuestion> = generated
        .questions
        .into_iter()
        .filter(|q| q.options.contains(&q.correct_answer))
        .collect();
    if questions.len() < total {
        warn!(
            "Dropped {} quiz questions whose correct answer is not an option",
            total - questions.len()
        );
    }
    questions
}

/// Short coaching tip for the wrong answers. `None` when generation fails.
pub async fn generate_improvement_tip(
    llm: &dyn TextGenerator,
    industry: &str,
    wrong_answers: &[&QuestionResult],
) -> Option<String> {
    let wrong_text = wrong_answers
        .iter()
        .map(|q| {
            format!(
                "Question: \"{}\"\nCorrect Answer: \"{}\"\nUser Answer: \"{}\"",
                q.question,
                q.answer,
                q.user_answer.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = fill_template(
        IMPROVEMENT_TIP_PROMPT_TEMPLATE,
        &[("industry", industry), ("wrong_answers", wrong_text.as_str())],
    );

    generate_text_or_none(llm, &prompt, PLAIN_TEXT_SYSTEM, "improvement tip").await
}
