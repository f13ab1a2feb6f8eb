use uuid::Uuid;

use crate::models::assessment::VoiceFeedback;
use crate::notify::Email;

/// Minimal HTML escaping for model-generated text placed in email bodies.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Quiz completion email. `score` is a percentage.
pub fn quiz_result_email(to: &str, score: f64, tip: Option<&str>, app_url: &str) -> Email {
    let tip_html = match tip {
        Some(tip) => format!(
            "<p><strong>Tip for next time:</strong> {}</p>",
            escape_html(tip)
        ),
        None => "<p>Perfect score! Keep it up.</p>".to_string(),
    };

    Email {
        to: to.to_string(),
        subject: format!("Quiz Results: {score:.1}%"),
        html: format!(
            "<h1>Your Quiz Results are In!</h1>\
             <p>You just completed a technical quiz. Here is how you did:</p>\
             <h2>Score: <strong>{score:.1}%</strong></h2>\
             {tip_html}\
             <br />\
             <a href=\"{app_url}/interview\">View Your Progress</a>"
        ),
    }
}

/// Voice interview feedback email. Scores are out of 10.
pub fn voice_feedback_email(
    to: &str,
    feedback: &VoiceFeedback,
    assessment_id: Uuid,
    app_url: &str,
) -> Email {
    let score = feedback.total_score;
    Email {
        to: to.to_string(),
        subject: format!("Interview Feedback: {score}/10"),
        html: format!(
            "<h1>Your Interview Feedback is Ready!</h1>\
             <p>Great job completing your mock interview. Here is your summary:</p>\
             <h2>Score: <strong>{score}/10</strong></h2>\
             <h3>Overall Feedback:</h3>\
             <p>{}</p>\
             <br />\
             <a href=\"{app_url}/interview/feedback/{assessment_id}\">View Full Detailed Feedback</a>",
            escape_html(&feedback.final_assessment)
        ),
    }
}
