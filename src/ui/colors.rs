//! Shared color palette for the TUI.

use ratatui::style::Color;

// ── Message roles ───────────────────────────────────────────────────
pub const ROLE_USER: Color = Color::Rgb(120, 160, 220);
pub const ROLE_ASSISTANT: Color = Color::Rgb(80, 220, 120);
pub const SUB_AGENT: Color = Color::Rgb(200, 140, 255);

// ── Step statuses ───────────────────────────────────────────────────
pub const STEP_INFO: Color = Color::Rgb(160, 160, 160);
pub const STEP_SUCCESS: Color = Color::Rgb(80, 220, 120);
pub const STEP_WARNING: Color = Color::Rgb(230, 160, 60);
pub const STEP_FAILED: Color = Color::Rgb(220, 80, 80);
pub const STEP_DEBUG: Color = Color::Rgb(100, 100, 100);

// ── Judge verdicts ──────────────────────────────────────────────────
pub const JUDGE_CORRECT: Color = Color::Rgb(80, 220, 120);
pub const JUDGE_INCORRECT: Color = Color::Rgb(220, 80, 80);
pub const JUDGE_UNKNOWN: Color = Color::Rgb(160, 160, 160);

// ── Accent / chrome ─────────────────────────────────────────────────
pub const TOOL_CALL: Color = Color::Rgb(255, 180, 50);
pub const ACCENT_MUTED: Color = Color::Rgb(120, 120, 180);
pub const HIGHLIGHT_BG: Color = Color::Rgb(60, 55, 50);
pub const HIGHLIGHT_FG: Color = Color::Rgb(255, 220, 150);
