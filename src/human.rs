//! Human interaction surface: the three textual prompts an interactive
//! participant answers. The engine talks to a [`HumanTransport`] trait
//! so tests can script a player; [`ConsoleTransport`] is the stdin/
//! stdout implementation used by the binary.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use crate::state::Vote;

pub trait HumanTransport: Send + Sync {
    /// Ask for a short non-numeric clue phrase during speaking.
    fn ask_word(&self, agent_id: &str, theme: &str, card: u8) -> String;

    /// Ask for PLAY/WAIT during voting. Any non-"PLAY" input is WAIT.
    fn ask_vote(
        &self,
        agent_id: &str,
        last_played_card: u8,
        other_utterances: &BTreeMap<String, String>,
    ) -> Vote;

    /// Ask for an optional discussion question (None = skip).
    fn ask_question(&self, agent_id: &str) -> Option<String>;

    /// Ask for an optional answer to an outstanding question.
    fn ask_answer(&self, agent_id: &str, owner: &str, question: &str) -> Option<String>;
}

/// Interactive console transport with the original Japanese prompts.
pub struct ConsoleTransport;

impl ConsoleTransport {
    fn read_line(&self) -> String {
        let mut line = String::new();
        // EOF or a read error counts as an empty entry.
        let _ = io::stdin().lock().read_line(&mut line);
        line.trim().to_string()
    }

    fn prompt(&self, text: &str) -> String {
        print!("{text}");
        let _ = io::stdout().flush();
        self.read_line()
    }
}

impl HumanTransport for ConsoleTransport {
    fn ask_word(&self, agent_id: &str, theme: &str, card: u8) -> String {
        println!("\n=== {agent_id} の番 ===");
        println!("お題: {theme}");
        println!("あなたの数字（秘密）: {card}/100");
        self.prompt("数字を言わずに、度合いを表す単語/短いフレーズを入力してください: ")
    }

    fn ask_vote(
        &self,
        agent_id: &str,
        last_played_card: u8,
        other_utterances: &BTreeMap<String, String>,
    ) -> Vote {
        println!("\n=== {agent_id} の判断 ===");
        println!("場の最大値: {last_played_card}");
        if other_utterances.is_empty() {
            println!("他プレイヤーの発言: (なし)");
        } else {
            println!("他プレイヤーの発言:");
            for (agent, word) in other_utterances {
                println!("- {agent}: {word}");
            }
        }
        Vote::from_text(&self.prompt("今出すなら PLAY / 待つなら WAIT を入力: "))
    }

    fn ask_question(&self, _agent_id: &str) -> Option<String> {
        let input = self.prompt("あなたの質問（空ならスキップ）: ");
        (!input.is_empty()).then_some(input)
    }

    fn ask_answer(&self, _agent_id: &str, owner: &str, _question: &str) -> Option<String> {
        let input = self.prompt(&format!("あなたの回答（質問者={owner}）: "));
        (!input.is_empty()).then_some(input)
    }
}
