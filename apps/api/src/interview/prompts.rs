// All LLM prompt templates for the interview module.
// Placeholders are `{name}` and are filled by `fill_template`.

/// Voice interview question generation. Expects `{"questions": [{question, followUp}]}`.
pub const VOICE_QUESTIONS_PROMPT_TEMPLATE: &str = r#"
You are an expert technical interviewer. Generate {count} unique interview questions for a {level} {topic} position.
Provide a simple one-sentence follow-up question for each.
Do not repeat any of these previous questions: {previous_questions}.

Return ONLY a JSON object in this exact format:
{
  "questions": [
    {
      "question": "string",
      "followUp": "string"
    }
  ]
}
"#;

/// Transcript evaluation. Expects a `VoiceFeedback` object.
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"
You are an expert interview coach. Analyze the following interview transcript.
Provide constructive feedback and a score (from 1 to 10) for each question answered by the user.
Also provide an overall summary and a final score from 1-10.
The user's answers are from the 'user' role.

Return ONLY a JSON object in this exact format:
{
  "totalScore": 10,
  "finalAssessment": "string",
  "individualFeedback": [
    {
      "question": "string",
      "answer": "string",
      "feedback": "string",
      "score": 10
    }
  ]
}

Transcript:
{transcript}
"#;

/// Multiple-choice quiz generation. Expects `{"questions": [QuizQuestion]}`.
pub const QUIZ_PROMPT_TEMPLATE: &str = r#"
Generate {count} technical interview questions for a {industry} professional{skills_clause}.

Each question should be multiple choice with {options} options.

Return the response in this JSON format only, no additional text:
{
  "questions": [
    {
      "question": "string",
      "options": ["string", "string", "string", "string"],
      "correctAnswer": "string",
      "explanation": "string"
    }
  ]
}
"#;

/// Improvement tip from wrong quiz answers. Plain text response.
pub const IMPROVEMENT_TIP_PROMPT_TEMPLATE: &str = r#"
The user got the following {industry} technical interview questions wrong:

{wrong_answers}

Based on these mistakes, provide a concise, specific improvement tip.
Focus on the knowledge gaps revealed by these wrong answers.
Keep the response under 2 sentences and make it encouraging.
Don't explicitly mention the mistakes, instead focus on what to learn/practice.
"#;

/// Fills `{name}` placeholders in one pass over `template`.
///
/// Substituted values are never rescanned, so user text that happens to look
/// like a placeholder is kept verbatim. Braces that do not name a known
/// placeholder (the JSON examples above) are left alone.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let value = tail.find('}').and_then(|close| {
            let name = &tail[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
