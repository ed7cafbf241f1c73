//! Prompt templates and fixed strings for each decision-provider role.
//!
//! Templates use `{name}` placeholders filled by [`fill`]. Every prompt
//! demands a single JSON object so responses go through the decoder
//! unchanged.

/// Fixed theme pool used when no theme is configured.
pub const THEMES_JA: &[&str] = &[
    "動物の大きさ",
    "生き物の強さ",
    "食べ物の辛さ",
    "食べ物の人気",
    "乗り物の速さ",
    "場所の混み具合",
    "音の大きさ",
    "季節のイベントの盛り上がり",
];

/// Speaker: produce one non-numeric clue for the secret card.
pub const SPEAKER_PROMPT: &str = "\
あなたは協力ゲーム「ito」のプレイヤーです。
お題: {theme}
あなたの秘密の数字: {number}（1〜100）

数字そのものや桁を一切言わずに、お題に沿って数字の度合いを表す
単語または短いフレーズを1つ答えてください。

これまでの経過:
{history}

次のJSONオブジェクトのみを出力してください:
{\"word\": \"<発言>\", \"reasoning\": \"<なぜその発言にしたか>\"}
";

/// Estimator: decide PLAY or WAIT for the current round.
pub const ESTIMATOR_PROMPT: &str = "\
あなたは協力ゲーム「ito」のプレイヤーです。カードは昇順に出さなければ
なりません。自分の数字が場の最大値より大きく、かつ他の誰よりも小さい
と確信できるなら PLAY、そうでなければ WAIT を選んでください。

お題: {theme}
場の最大値: {last_played_card}
あなたの数字: {my_number}
あなたの発言: {my_word}
他プレイヤーの発言:
{utterances}

これまでの経過:
{history}

次のJSONオブジェクトのみを出力してください:
{\"action\": \"PLAY\" または \"WAIT\", \"thought\": \"<判断の理由>\"}
";

/// Discussion moderator: one clarifying question when everyone waits.
pub const DISCUSSION_QUESTION_PROMPT: &str = "\
協力ゲーム「ito」で全員がWAITを選び、進行が止まりました。あなたは
司会として、発言の度合いを明確にする質問を1つ作ってください。
数字を直接尋ねてはいけません。

お題: {theme}
場の最大値: {last_played_card}
各プレイヤーの発言:
{utterances}

これまでの経過:
{history}

次のJSONオブジェクトのみを出力してください:
{\"question\": \"<質問>\"}
";

/// Discussion: one short question proposed by a player.
pub const DISCUSSION_PLAYER_QUESTION_PROMPT: &str = "\
協力ゲーム「ito」で全員がWAITを選び、進行が止まりました。あなたは
プレイヤーとして、他の発言の度合いを確かめる短い質問を1つ提案して
ください。数字を直接尋ねてはいけません。

お題: {theme}
場の最大値: {last_played_card}
あなたの発言: {my_word}
各プレイヤーの発言:
{utterances}

これまでの経過:
{history}

次のJSONオブジェクトのみを出力してください:
{\"question\": \"<質問>\"}
";

/// Discussion: a short, non-numeric answer to an outstanding question.
pub const DISCUSSION_ANSWER_PROMPT: &str = "\
協力ゲーム「ito」の会話フェーズです。次の質問に、自分の発言の意図が
伝わるように短く答えてください。数字を言ってはいけません。

お題: {theme}
質問: {question}
あなたの発言: {my_word}

これまでの経過:
{history}

次のJSONオブジェクトのみを出力してください:
{\"answer\": \"<回答>\"}
";

/// Fallback moderator question (mock default and error fallback).
pub const DEFAULT_MODERATOR_QUESTION: &str =
    "それぞれの発言は、どれくらい強い/大きいイメージですか？";

/// Fallback player question (mock default and error fallback).
pub const DEFAULT_PLAYER_QUESTION: &str = "今の発言は、どんなイメージの度合いですか？";

/// Fallback answer (mock default and error fallback).
pub const DEFAULT_ANSWER: &str =
    "私の発言は、直感的にイメージできる範囲の強さ/大きさを意図しています。";

/// Placeholder recorded when a human submits an empty clue.
pub const SILENT_UTTERANCE: &str = "（無言）";

/// Fill `{name}` placeholders in a template.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Render an utterance table for prompt interpolation.
pub fn utterance_table(utterances: &std::collections::BTreeMap<String, String>) -> String {
    utterances
        .iter()
        .map(|(agent, word)| format!("{agent}: {word}"))
        .collect::<Vec<_>>()
        .join("\n")
}
