// src/interview/prompts.rs — Summary prompts and fixed assistant texts

use super::session::Turn;
use super::topics::render_transcript;

/// Sent back to the user once the interview is finalized.
pub const FINAL_ACKNOWLEDGEMENT: &str = "Thanks to your thoughtful answers we now understand \
your travel style much better! We'll use it to look for travel mates and destinations that suit you.";

const INTRO: &str = "The following conversation is a Q&A meant to understand the user's travel personality.";

/// Draft: empathize, summarize everything so far, ask for additions.
pub fn draft_summary_prompt(history: &[Turn]) -> String {
    let mut prompt = String::with_capacity(512 + history.len() * 128);
    prompt.push_str(INTRO);
    prompt.push('\n');
    prompt.push_str("First, empathize with the user's last answer.\n");
    prompt.push_str(
        "Then summarize all of the user's answers so far in a single paragraph without \
         leaving anything out, and ask whether there is anything they would like to add.\n\n",
    );
    append_transcript(&mut prompt, history);
    prompt
}

/// Final: one paragraph, nothing else.
pub fn final_summary_prompt(history: &[Turn]) -> String {
    let mut prompt = String::with_capacity(512 + history.len() * 128);
    prompt.push_str(INTRO);
    prompt.push('\n');
    prompt.push_str(
        "Summarize the user's answers in a single paragraph without leaving anything out.\n\n",
    );
    append_transcript(&mut prompt, history);
    prompt
}

fn append_transcript(prompt: &mut String, history: &[Turn]) {
    prompt.push_str("Conversation:\n");
    prompt.push_str(&render_transcript(history));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_prompt_asks_for_feedback() {
        let p = draft_summary_prompt(&[Turn::user("beaches")]);
        assert!(p.contains("empathize"));
        assert!(p.contains("anything they would like to add"));
        assert!(p.ends_with("Conversation:\nuser: beaches"));
    }

    #[test]
    fn test_final_prompt_has_no_feedback_request() {
        let p = final_summary_prompt(&[Turn::user("mountains")]);
        assert!(!p.contains("would like to add"));
        assert!(p.contains("user: mountains"));
    }
}
