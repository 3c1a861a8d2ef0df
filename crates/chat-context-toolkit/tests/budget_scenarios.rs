//! End-to-end budgeting scenarios.
//!
//! Token cost is the character length of the rendered message
//! (`CharTokenCounter::exact`), so each message's cost is the length of its
//! content.

use chat_context_toolkit::history::abbreviation::abbreviate_history;
use chat_context_toolkit::prelude::*;

fn user(id: &str, cost: usize) -> HistoryMessage {
    HistoryMessage::new(id, Message::user("x".repeat(cost)))
}

fn user_with_abbreviation(id: &str, cost: usize, abbreviated_cost: usize) -> HistoryMessage {
    user(id, cost).with_abbreviation(Message::user("y".repeat(abbreviated_cost)))
}

async fn run(
    turn: &mut TurnWindow,
    token_budget: usize,
    history: &[HistoryMessage],
) -> Result<BudgetedResult, HistoryError> {
    let provider = InMemoryProvider::new(history.to_vec());
    apply_budget(turn, token_budget, &CharTokenCounter::exact(), &provider).await
}

// ── Scenarios ────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_history_gives_empty_result() {
    for budget in [0, 1, 1000] {
        let mut turn = TurnWindow::new(10);
        let result = run(&mut turn, budget, &[]).await.unwrap();
        assert!(result.messages.is_empty());
    }
}

#[tokio::test]
async fn everything_fits_at_full_fidelity() {
    let history = vec![user("a", 5), user("b", 8), user("c", 3)];
    let mut turn = TurnWindow::new(10);
    let result = run(&mut turn, 20, &history).await.unwrap();

    assert_eq!(result.ids(), vec!["a", "b", "c"]);
    assert!(result.entries.iter().all(|e| e.rendering == Rendering::Full));
    assert_eq!(result.report.total_tokens, 16);
}

#[tokio::test]
async fn old_message_is_abbreviated_to_fit() {
    let history = vec![
        user_with_abbreviation("a", 28, 5),
        user("b", 11),
        user("c", 3),
    ];
    let mut turn = TurnWindow::new(15);
    let result = run(&mut turn, 20, &history).await.unwrap();

    assert_eq!(result.ids(), vec!["a", "b", "c"]);
    assert_eq!(result.entries[0].rendering, Rendering::Abbreviated);
    assert_eq!(result.messages[0].content.as_deref(), Some("yyyyy"));
    assert_eq!(result.entries[1].rendering, Rendering::Full);
    assert_eq!(result.entries[2].rendering, Rendering::Full);
    assert_eq!(result.report.total_tokens, 19);
}

#[tokio::test]
async fn only_the_high_priority_tail_survives() {
    let history = vec![user("a", 10), user("b", 10), user("c", 9), user("d", 9)];
    let mut turn = TurnWindow::new(18);
    let result = run(&mut turn, 20, &history).await.unwrap();

    assert_eq!(result.ids(), vec!["c", "d"]);
    assert!(result.entries.iter().all(|e| e.high_priority));
    assert_eq!(result.report.dropped_count, 2);
}

#[tokio::test]
async fn budget_below_every_rendering_is_infeasible() {
    let history = vec![
        user_with_abbreviation("a", 43, 20),
        user_with_abbreviation("b", 25, 15),
    ];
    let mut turn = TurnWindow::new(100);
    let err = run(&mut turn, 10, &history).await.unwrap_err();
    assert!(matches!(
        err,
        HistoryError::BudgetInfeasible {
            budget: 10,
            required: 15
        }
    ));

    // Without abbreviations the full cost is the cheapest rendering.
    let history = vec![user("a", 43), user("b", 25)];
    let mut turn = TurnWindow::new(100);
    let err = run(&mut turn, 10, &history).await.unwrap_err();
    assert!(matches!(
        err,
        HistoryError::BudgetInfeasible {
            budget: 10,
            required: 25
        }
    ));
}

#[tokio::test]
async fn tool_call_pairs_are_preserved_in_order() {
    let history = vec![
        HistoryMessage::new("q", Message::user("What's in src?")),
        HistoryMessage::new(
            "call",
            Message::assistant_tool_calls(vec![ToolCall::function(
                "c1",
                "ls",
                r#"{"path":"src"}"#,
            )]),
        ),
        HistoryMessage::new("result", Message::tool_result("c1", "lib.rs main.rs")),
        HistoryMessage::new("answer", Message::assistant_text("Two files.")),
    ];
    let mut turn = TurnWindow::new(1000);
    let result = run(&mut turn, 10_000, &history).await.unwrap();

    assert_eq!(result.ids(), vec!["q", "call", "result", "answer"]);
    assert_eq!(result.messages[1].tool_call_ids(), vec!["c1"]);
    assert_eq!(result.messages[2].tool_call_id.as_deref(), Some("c1"));
    assert_eq!(result.report.unpaired_removed, 0);
}

#[tokio::test]
async fn tool_result_at_the_tail_keeps_its_call() {
    let history = vec![
        user("q", 30),
        HistoryMessage::new(
            "call",
            Message::assistant_tool_calls(vec![ToolCall::function(
                "c1",
                "read_file",
                r#"{"path":"notes.md"}"#,
            )]),
        ),
        HistoryMessage::new("result", Message::tool_result("c1", "r".repeat(8))),
    ];
    // The call costs 28, the result 8. The allotment alone would only
    // cover the result.
    let mut turn = TurnWindow::new(8);
    let result = run(&mut turn, 40, &history).await.unwrap();

    assert_eq!(turn.pinned_boundary(), Some("call"));
    assert_eq!(result.ids(), vec!["call", "result"]);
    assert!(result.entries.iter().all(|e| e.high_priority));
    assert_eq!(result.messages[0].tool_call_ids(), vec!["c1"]);
    assert_eq!(result.messages[1].tool_call_id.as_deref(), Some("c1"));
    assert_eq!(result.report.dropped_count, 1);
    assert_eq!(result.report.total_tokens, 36);

    // Too small for the pair: an error, never an empty request.
    let mut turn = TurnWindow::new(8);
    let err = run(&mut turn, 20, &history).await.unwrap_err();
    assert!(matches!(
        err,
        HistoryError::BudgetInfeasible {
            budget: 20,
            required: 36
        }
    ));
}

// ── Turn behavior ────────────────────────────────────────────────────

#[tokio::test]
async fn high_priority_set_only_grows_within_a_turn() {
    let provider = InMemoryProvider::new(vec![user("a", 10), user("b", 10), user("c", 10)]);
    let counter = CharTokenCounter::exact();
    let mut turn = TurnWindow::new(20);

    let first = apply_budget(&mut turn, 1000, &counter, &provider)
        .await
        .unwrap();
    let high_first: Vec<String> = first
        .entries
        .iter()
        .filter(|e| e.high_priority)
        .map(|e| e.id.clone())
        .collect();
    assert_eq!(high_first, vec!["b", "c"]);

    // A tool-call round appends to the history.
    provider.push(HistoryMessage::new(
        "call",
        Message::assistant_tool_calls(vec![ToolCall::function("c1", "grep", r#"{"q":"x"}"#)]),
    ));
    provider.push(HistoryMessage::new(
        "result",
        Message::tool_result("c1", "r".repeat(40)),
    ));

    let second = apply_budget(&mut turn, 1000, &counter, &provider)
        .await
        .unwrap();
    let high_second: Vec<&str> = second
        .entries
        .iter()
        .filter(|e| e.high_priority)
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(high_second, vec!["b", "c", "call", "result"]);
    assert!(!second.entries[0].high_priority);
    assert_eq!(turn.pinned_boundary(), Some("b"));

    // A new turn recomputes the boundary from the tail.
    turn.reset();
    let third = apply_budget(&mut turn, 1000, &counter, &provider)
        .await
        .unwrap();
    // The call and its result form one unit, so both are high priority.
    assert_eq!(turn.pinned_boundary(), Some("call"));
    assert_eq!(third.report.high_priority_count, 2);
}

#[tokio::test]
async fn budget_config_drives_a_turn() {
    let budget = HistoryBudget::default()
        .with_max_tokens(60)
        .with_output_reserve(20)
        .with_high_priority_tokens(12);
    let history = vec![
        user_with_abbreviation("a", 30, 3),
        user("b", 15),
        user("c", 12),
    ];
    let provider = InMemoryProvider::new(history);
    let counter = CharTokenCounter::exact();
    let mut turn = budget.new_turn();

    let result = apply_budget(
        &mut turn,
        budget.effective_max_tokens(),
        &counter,
        &provider,
    )
    .await
    .unwrap();

    // Only "c" fits the 12-token allotment; "a" is abbreviated to reach 30.
    assert_eq!(turn.pinned_boundary(), Some("c"));
    assert_eq!(result.ids(), vec!["a", "b", "c"]);
    assert_eq!(result.report.total_tokens, 30);
    let usage = budget.usage(&result.messages, &counter);
    assert_eq!(usage.to_log_string(), "context: ~30 tokens (75% of 40)");
}

#[tokio::test]
async fn transcript_with_default_abbreviations() {
    let long_output = "line\n".repeat(400);
    let json = serde_json::json!([
        {"id": "q", "role": "user", "content": "Read the log."},
        {"id": "call", "role": "assistant", "tool_calls": [
            {"id": "c1", "type": "function",
             "function": {"name": "read_file", "arguments": "{\"path\":\"app.log\"}"}}
        ]},
        {"id": "log", "role": "tool", "tool_call_id": "c1", "content": long_output},
        {"id": "ask", "role": "user", "content": "Any errors?"}
    ])
    .to_string();

    let history = abbreviate_history(
        parse_transcript(&json).unwrap(),
        &AbbreviationConfig::default(),
    );
    assert!(history[2].has_abbreviation());

    let mut turn = TurnWindow::new(20);
    let result = run(&mut turn, 200, &history).await.unwrap();

    assert_eq!(result.ids(), vec!["q", "call", "log", "ask"]);
    assert_eq!(result.entries[2].rendering, Rendering::Abbreviated);
    assert_eq!(
        result.messages[2].content.as_deref(),
        Some(r#"[Cleared: read_file(path="app.log"), 2000 chars]"#)
    );
    assert_eq!(result.messages[2].tool_call_id.as_deref(), Some("c1"));
}
