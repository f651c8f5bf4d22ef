// Pocketkeys Replay CLI
// Feeds scripted hardware key events through an input session and prints the result

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use serde::Deserialize;

use pocketkeys_core::layout::NUMERIC_LAYOUT;
use pocketkeys_core::{
    shared_cache, CommandSink, DirectionalCommand, EditorClass, EditorInfo, HostActions,
    InputSession, Key, KeyEdge, KeyEvent, KeyOutcome, LayoutManager, LayoutProvider,
    MediaCommand, MemoryTextSink, Settings, StaticLayoutProvider, TextSink, TomlLayoutProvider,
};

const BUNDLED_ENGLISH: &str = include_str!("../../layouts/english.toml");
const BUNDLED_NUMERIC: &str = include_str!("../../layouts/numeric.toml");

/// Key release time when a script event gives none
const DEFAULT_TAP_MS: u64 = 40;

/// Replay hardware keyboard events through the pocketkeys engine
#[derive(Parser, Debug)]
#[command(name = "pocketkeys")]
#[command(version)]
#[command(about = "Replay hardware keyboard events through the pocketkeys engine", long_about = None)]
struct Args {
    /// Settings file (default: ~/.config/pocketkeys/settings.toml)
    #[arg(short, long, value_name = "SETTINGS")]
    settings: Option<PathBuf>,

    /// Directory of <id>.toml layout files (default: bundled layouts)
    #[arg(short, long, value_name = "DIR")]
    layouts: Option<PathBuf>,

    /// Layouts to cycle through on Shift+Alt, first one active (can be used multiple times)
    #[arg(long = "layout", value_name = "ID")]
    layout_ids: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate settings and layouts and exit
    #[arg(long)]
    check: bool,

    /// Event script to replay
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,
}

/// Replay script: the focused editor plus a list of key events
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Script {
    /// Owning application of the editor
    #[serde(default = "default_package")]
    package: String,

    /// text, number, datetime, phone or null
    #[serde(default)]
    class: Option<String>,

    /// Override whether the editor accepts composing text
    #[serde(default)]
    suggestions: Option<bool>,

    /// Field content before the first event; the cursor starts at its end
    #[serde(default)]
    text: String,

    #[serde(default, rename = "event")]
    events: Vec<ScriptEvent>,
}

/// `[[event]]`: one physical key press
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptEvent {
    key: String,
    down_ms: u64,
    #[serde(default)]
    up_ms: Option<u64>,
    /// Auto-repeat events spread evenly between press and release
    #[serde(default)]
    hold_repeats: u32,
    #[serde(default)]
    ctrl: bool,
}

fn default_package() -> String {
    "replay".to_string()
}

impl Script {
    fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse script {}", path.display()))
    }

    fn editor(&self) -> Result<EditorInfo> {
        let class = match &self.class {
            Some(name) => name
                .parse::<EditorClass>()
                .map_err(|_| anyhow!("Unknown editor class '{}'", name))?,
            None => EditorClass::Text,
        };
        let mut editor = EditorInfo::new(self.package.clone(), class);
        if let Some(allowed) = self.suggestions {
            editor = editor.with_suggestions(allowed);
        }
        Ok(editor)
    }

    /// Expand the script into a time-ordered event stream
    fn key_events(&self) -> Result<Vec<KeyEvent>> {
        let mut timeline = Vec::new();

        for step in &self.events {
            let key: Key = step.key.parse().map_err(|e: String| anyhow!(e))?;
            let up = step.up_ms.unwrap_or(step.down_ms + DEFAULT_TAP_MS);
            if up < step.down_ms {
                bail!("Event {} at {}ms is released before it is pressed", step.key, step.down_ms);
            }

            let ctrl = |event: KeyEvent| if step.ctrl { event.with_ctrl() } else { event };
            timeline.push(ctrl(KeyEvent::press(key, step.down_ms)));
            let slots = u64::from(step.hold_repeats) + 1;
            for n in 1..=step.hold_repeats {
                let time = step.down_ms + (up - step.down_ms) * u64::from(n) / slots;
                timeline.push(ctrl(KeyEvent::repeat(key, time, n)));
            }
            timeline.push(ctrl(KeyEvent::release(key, up)));
        }

        // stable: events at the same time keep script order
        timeline.sort_by_key(|event| event.time);
        Ok(timeline)
    }
}

/// Host side of the replay: counts layout switch requests
struct ReplayHost {
    switch_requests: Rc<Cell<u32>>,
}

impl HostActions for ReplayHost {
    fn switch_layout(&mut self) {
        self.switch_requests.set(self.switch_requests.get() + 1);
    }

    fn toggle_emoji_panel(&mut self) {
        println!("emoji panel toggled");
    }

    fn notify_layout_load_failed(&mut self, layout_id: &str) {
        log::warn!("Layout '{}' could not be loaded", layout_id);
    }
}

/// Pad commands are printed as they arrive
struct PrintCommands;

impl CommandSink for PrintCommands {
    fn directional(&mut self, command: DirectionalCommand, edge: KeyEdge, shift: bool) {
        let shift = if shift { " +shift" } else { "" };
        println!("directional: {} {:?}{}", command, edge, shift);
    }

    fn media(&mut self, command: MediaCommand, edge: KeyEdge) {
        println!("media: {} {:?}", command, edge);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Settings::load_default().context("Failed to load default settings"),
    }
}

fn layout_provider(dir: Option<&Path>) -> Arc<dyn LayoutProvider> {
    match dir {
        Some(dir) => Arc::new(TomlLayoutProvider::new(dir)),
        None => Arc::new(
            StaticLayoutProvider::new()
                .with_layout("english", BUNDLED_ENGLISH)
                .with_layout(NUMERIC_LAYOUT, BUNDLED_NUMERIC),
        ),
    }
}

/// Validate configuration
fn check(provider: &dyn LayoutProvider, layout_ids: &[String]) -> Result<()> {
    for layout_id in layout_ids.iter().map(String::as_str).chain([NUMERIC_LAYOUT]) {
        let table = provider
            .load(layout_id)
            .with_context(|| format!("Layout '{}' is invalid", layout_id))?;
        println!("{}: {} ({} keys)", layout_id, table.name(), table.len());
    }
    println!("Configuration is valid");
    Ok(())
}

// What the editor does with a key the engine passed through
fn deliver_to_editor(event: &KeyEvent, sink: &mut MemoryTextSink) {
    if event.ctrl {
        return;
    }
    match event.key {
        Key::ENTER => sink.commit_text("\n"),
        Key::BACKSPACE => sink.send_backspace(),
        _ => {}
    }
}

fn replay(
    settings: Settings,
    provider: Arc<dyn LayoutProvider>,
    layout_ids: &[String],
    script: &Script,
) -> Result<(MemoryTextSink, InputSession)> {
    let editor = script.editor()?;
    let events = script.key_events()?;
    let suggestions = editor.suggestions_allowed;

    let switch_requests = Rc::new(Cell::new(0));
    let layouts = LayoutManager::new(provider, shared_cache());
    let mut session = InputSession::new(settings, layouts)
        .with_host(ReplayHost {
            switch_requests: Rc::clone(&switch_requests),
        })
        .with_commands(PrintCommands);

    let mut current = 0;
    session.switch_layout(&layout_ids[current], suggestions, None);
    session.start_input(editor, false);

    let mut sink = MemoryTextSink::with_text(script.text.clone());
    session.refresh_caps(&sink);

    for event in &events {
        let outcome = if event.is_down() {
            session.key_down(event, Some(&mut sink))
        } else {
            session.key_up(event)
        };
        log::debug!("{} {} at {}ms: {:?}", event.key, event.action, event.time, outcome);

        if outcome == KeyOutcome::Unhandled && event.is_down() {
            deliver_to_editor(event, &mut sink);
        }

        while switch_requests.get() > 0 {
            switch_requests.set(switch_requests.get() - 1);
            current = (current + 1) % layout_ids.len();
            session.switch_layout(&layout_ids[current], suggestions, Some(&mut sink));
        }
    }

    Ok((sink, session))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = load_settings(args.settings.as_deref())?;
    let provider = layout_provider(args.layouts.as_deref());
    let layout_ids = if args.layout_ids.is_empty() {
        vec![settings.default_layout().to_string()]
    } else {
        args.layout_ids.clone()
    };

    if args.check {
        return check(provider.as_ref(), &layout_ids);
    }

    let script_path = args
        .script
        .as_deref()
        .context("A SCRIPT is required unless --check is given")?;
    let script = Script::load(script_path)?;
    let (sink, session) = replay(settings, provider, &layout_ids, &script)?;

    let snapshot = session.snapshot();
    println!("text: {:?}", sink.text());
    println!("composing: {:?}", sink.composing_text());
    println!("layout: {}", session.layouts().current_id().unwrap_or("none"));
    println!(
        "modifiers: shift {}, alt {}, sym {}",
        snapshot.shift.latch, snapshot.alt.latch, snapshot.sym.latch
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketkeys_core::KeyAction;

    fn script(content: &str) -> Script {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["pocketkeys", "demo.toml"]);

        assert_eq!(args.script, Some(PathBuf::from("demo.toml")));
        assert!(args.settings.is_none());
        assert!(args.layouts.is_none());
        assert!(args.layout_ids.is_empty());
        assert!(!args.verbose);
        assert!(!args.check);
    }

    #[test]
    fn test_args_with_options() {
        let args = Args::parse_from([
            "pocketkeys",
            "--settings",
            "/tmp/settings.toml",
            "--layouts",
            "/tmp/layouts",
            "--layout",
            "english",
            "--layout",
            "german",
            "--verbose",
            "--check",
        ]);

        assert_eq!(args.settings, Some(PathBuf::from("/tmp/settings.toml")));
        assert_eq!(args.layouts, Some(PathBuf::from("/tmp/layouts")));
        assert_eq!(args.layout_ids, vec!["english", "german"]);
        assert!(args.verbose);
        assert!(args.check);
        assert!(args.script.is_none());
    }

    #[test]
    fn test_script_expands_repeats() {
        let script = script(
            r#"
            [[event]]
            key = "H"
            down_ms = 100
            up_ms = 500
            hold_repeats = 3
            "#,
        );

        let events = script.key_events().unwrap();
        let times: Vec<u64> = events.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![100, 200, 300, 400, 500]);
        assert_eq!(events[2].repeat_count, 2);
        assert_eq!(events[4].action, KeyAction::Release);
    }

    #[test]
    fn test_script_interleaves_overlapping_keys() {
        let script = script(
            r#"
            [[event]]
            key = "SYM"
            down_ms = 0
            up_ms = 300

            [[event]]
            key = "W"
            down_ms = 100
            "#,
        );

        let order: Vec<(Key, u64)> = script
            .key_events()
            .unwrap()
            .iter()
            .map(|e| (e.key, e.time))
            .collect();
        assert_eq!(
            order,
            vec![(Key::SYM, 0), (Key::W, 100), (Key::W, 140), (Key::SYM, 300)]
        );
    }

    #[test]
    fn test_script_rejects_bad_key_and_class() {
        let bad_key = script("[[event]]\nkey = \"NOPE\"\ndown_ms = 0\n");
        assert!(bad_key.key_events().is_err());

        let bad_class = script("class = \"spreadsheet\"\n");
        assert!(bad_class.editor().is_err());
    }

    #[test]
    fn test_replay_bundled_english() {
        let script = script(
            r#"
            [[event]]
            key = "H"
            down_ms = 0

            [[event]]
            key = "I"
            down_ms = 400

            [[event]]
            key = "SPACE"
            down_ms = 800

            [[event]]
            key = "SPACE"
            down_ms = 900
            "#,
        );
        let settings = Settings::from_toml("[features]\nauto_capitalization = false\n").unwrap();

        let (sink, _) = replay(
            settings,
            layout_provider(None),
            &["english".to_string()],
            &script,
        )
        .unwrap();
        assert_eq!(sink.text(), "hi. ");
    }

    #[test]
    fn test_bundled_layouts_are_valid() {
        assert!(check(layout_provider(None).as_ref(), &["english".to_string()]).is_ok());
    }
}
