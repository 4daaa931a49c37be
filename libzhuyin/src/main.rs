//! Interactive CLI driving a [`libzhuyin::ZhuyinSession`] from the terminal.
//!
//! Kept from the teacher: clap's derive API and a REPL reading stdin line by
//! line. Rewritten: lines are fed through the IME a character at a time
//! instead of being parsed as a whole, since that's how `ImeEngine` actually
//! consumes keys; the old Build/Convert/Test subcommands assumed an
//! n-gram/FST toolchain that doesn't exist on this side of the crate and
//! are gone.

use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use libzhuyin::{KeyEvent, KeyResult, KeyboardLayoutKind, ZhuyinConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "libzhuyin")]
#[command(about = "Zhuyin/Bopomofo input method REPL")]
#[command(version)]
struct Cli {
    /// Directory containing fonetree.dat and dict.dat.
    #[arg(long, default_value = "data/zhuyin")]
    dict_dir: PathBuf,

    /// Path to the user phrase database (created if missing).
    #[arg(long)]
    userdict: Option<PathBuf>,

    /// Which keyboard layout to type with.
    #[arg(long, value_enum, default_value_t = CliLayout::Default)]
    layout: CliLayout,

    /// Enable Hsu's confusable-final correction (Hsu / DvorakHsu / Carpalx).
    #[arg(long)]
    correct_hsu: bool,

    /// Enable ET26's confusable-final correction.
    #[arg(long)]
    correct_eten26: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum CliLayout {
    Default,
    Hsu,
    Et,
    Et26,
    DachenCp26,
    HanyuPinyin,
    ThlPinyin,
    Mps2Pinyin,
    Dvorak,
    DvorakHsu,
    Ibm,
    GinYieh,
    Carpalx,
}

impl From<CliLayout> for KeyboardLayoutKind {
    fn from(l: CliLayout) -> Self {
        match l {
            CliLayout::Default => KeyboardLayoutKind::Default,
            CliLayout::Hsu => KeyboardLayoutKind::Hsu,
            CliLayout::Et => KeyboardLayoutKind::Et,
            CliLayout::Et26 => KeyboardLayoutKind::Et26,
            CliLayout::DachenCp26 => KeyboardLayoutKind::DachenCp26,
            CliLayout::HanyuPinyin => KeyboardLayoutKind::HanyuPinyin,
            CliLayout::ThlPinyin => KeyboardLayoutKind::ThlPinyin,
            CliLayout::Mps2Pinyin => KeyboardLayoutKind::Mps2Pinyin,
            CliLayout::Dvorak => KeyboardLayoutKind::Dvorak,
            CliLayout::DvorakHsu => KeyboardLayoutKind::DvorakHsu,
            CliLayout::Ibm => KeyboardLayoutKind::Ibm,
            CliLayout::GinYieh => KeyboardLayoutKind::GinYieh,
            CliLayout::Carpalx => KeyboardLayoutKind::Carpalx,
        }
    }
}

fn default_userdict_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".libzhuyin").join("userdict.redb")
}

/// Translate one line of typed text into key events: lowercase letters and
/// digits go straight through, a leading `:` introduces a small set of
/// control pseudo-keys (`:bs` backspace, `:esc` escape, `:left`/`:right`),
/// and the line itself always ends with Enter so a completed syllable
/// commits before the next line starts.
fn line_to_events(line: &str) -> Vec<KeyEvent> {
    if let Some(cmd) = line.strip_prefix(':') {
        return match cmd {
            "bs" => vec![KeyEvent::Backspace],
            "esc" => vec![KeyEvent::Escape],
            "left" => vec![KeyEvent::Left],
            "right" => vec![KeyEvent::Right],
            "up" => vec![KeyEvent::Up],
            "down" => vec![KeyEvent::Down],
            other => {
                warn!(command = other, "unknown REPL command, ignoring");
                Vec::new()
            }
        };
    }

    let mut events: Vec<KeyEvent> = line
        .chars()
        .map(|ch| match ch {
            '0'..='9' => KeyEvent::Number(ch.to_digit(10).unwrap() as u8),
            ' ' => KeyEvent::Space,
            other => KeyEvent::Char(other),
        })
        .collect();
    events.push(KeyEvent::Enter);
    events
}

fn run_repl(cli: Cli) -> Result<()> {
    let userdict = cli.userdict.clone().unwrap_or_else(default_userdict_path);

    let mut config = ZhuyinConfig::default();
    config.keyboard_layout = cli.layout.into();
    config.zhuyin_correct_hsu = cli.correct_hsu;
    config.zhuyin_correct_eten26 = cli.correct_eten26;

    let mut session = libzhuyin::open_session(&cli.dict_dir, &userdict, config)?;
    info!(dict_dir = %cli.dict_dir.display(), "libzhuyin session ready");

    println!("libzhuyin — type Zhuyin/Pinyin input, Enter to commit a syllable.");
    println!("Lines starting with ':' are commands (:bs, :esc, :left, :right, :up, :down).");
    println!("Ctrl-D to exit.");

    let stdout = io::stdout();
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        for event in line_to_events(&line) {
            let result = session.process_key(event);
            if result == KeyResult::NotHandled {
                continue;
            }
        }
        let ctx = session.context();
        if !ctx.commit_text.is_empty() {
            print!("{}", ctx.commit_text);
        }
        if !ctx.preedit_text.is_empty() {
            print!(" [{}]", ctx.preedit_text);
        }
        if !ctx.candidates.is_empty() {
            print!(
                " ({})",
                ctx.candidates
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{}:{}", i + 1, c))
                    .collect::<Vec<_>>()
                    .join(" ")
            );
        }
        println!();
        stdout.lock().flush().ok();
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    run_repl(cli)
}
