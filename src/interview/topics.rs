// src/interview/topics.rs — Topic tracking and question context rendering
//
// Coverage is judged by the model reading the rendered context, not by
// keyword matching here. Everything in this module is a pure function of the
// turn history.

use super::session::Turn;

/// The fixed interview agenda, in presentation order.
pub const TOPICS: [&str; 5] = [
    "Worst past travel experience and why",
    "One thing that must be present on this trip",
    "Desired traits of a travel companion",
    "What is most anticipated about this trip",
    "What life meaning this trip should deliver",
];

/// Topics still open for the next question.
///
/// Returns the full agenda in presentation order; the generator decides which
/// of them the transcript has already covered.
pub fn uncovered_topics(_history: &[Turn]) -> Vec<&'static str> {
    TOPICS.to_vec()
}

/// Render turns as `role: content` lines, in conversational order.
pub fn render_transcript(history: &[Turn]) -> String {
    history
        .iter()
        .map(|t| format!("{}: {}", t.role.as_str(), t.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the prompt that asks for the next interview question.
pub fn question_context(history: &[Turn]) -> String {
    let topics = uncovered_topics(history);
    let mut prompt = String::with_capacity(1024 + history.len() * 128);

    prompt.push_str(
        "You are an expert counselor getting to know the user's concrete travel personality.\n\n",
    );

    prompt.push_str("<goal>\n");
    prompt.push_str(&format!(
        "Obtain the user's answer on all {} of these topics:\n",
        topics.len()
    ));
    for topic in &topics {
        prompt.push_str("- ");
        prompt.push_str(topic);
        prompt.push('\n');
    }
    prompt.push('\n');

    prompt.push_str("<conversation so far>\n");
    if history.is_empty() {
        prompt.push_str("(no conversation yet)\n");
    } else {
        prompt.push_str(&render_transcript(history));
        prompt.push('\n');
    }
    prompt.push('\n');

    prompt.push_str("<instructions>\n");
    prompt.push_str("1. Work out which topics the conversation above has already covered.\n");
    prompt.push_str(
        "2. If there is no conversation yet, open with a friendly scene-setting line such as \
         \"To understand your travel style better, I've prepared a few questions. Answer freely, \
         whatever comes to mind!\" and then ask about one topic of your choice.\n",
    );
    prompt.push_str(
        "3. Otherwise pick the single uncovered topic that follows most naturally.\n",
    );
    prompt.push_str(
        "4. Empathize with the user's previous answer, then move naturally to the next question.\n",
    );
    prompt.push_str("5. Ask exactly one question.\n\n");

    prompt.push_str("Counselor's reply: ");
    prompt
}
