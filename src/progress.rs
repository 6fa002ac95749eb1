use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const SPINNER_TICKS_BRAILLE_COLORED: [&str; 8] = [
    "\x1b[1;96m⠁\x1b[0m",
    "\x1b[1;96m⠂\x1b[0m",
    "\x1b[1;96m⠄\x1b[0m",
    "\x1b[1;96m⡀\x1b[0m",
    "\x1b[1;96m⢀\x1b[0m",
    "\x1b[1;96m⠠\x1b[0m",
    "\x1b[1;96m⠐\x1b[0m",
    "\x1b[1;96m⠈\x1b[0m",
];

const SPINNER_TICKS_BRAILLE_PLAIN: [&str; 8] = ["⠁", "⠂", "⠄", "⡀", "⢀", "⠠", "⠐", "⠈"];
const SPINNER_TICKS_ASCII: &str = "|/-\\";

const STAGE_TOTAL: u8 = 2;

#[derive(Clone, Copy)]
pub enum Stage {
    Assemble,
    Render,
}

impl Stage {
    const fn index(self) -> u8 {
        match self {
            Self::Assemble => 1,
            Self::Render => 2,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Assemble => "Assemble",
            Self::Render => "Render",
        }
    }
}

pub struct ProgressState {
    multi: MultiProgress,
    style: ProgressStyle,
}

impl ProgressState {
    pub fn new(enabled: bool, use_color: bool) -> Self {
        let multi = MultiProgress::new();
        let target = if enabled {
            ProgressDrawTarget::stderr_with_hz(15)
        } else {
            ProgressDrawTarget::hidden()
        };
        multi.set_draw_target(target);
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let style = if is_dumb_term() {
            style.tick_chars(SPINNER_TICKS_ASCII)
        } else if use_color {
            style.tick_strings(&SPINNER_TICKS_BRAILLE_COLORED)
        } else {
            style.tick_strings(&SPINNER_TICKS_BRAILLE_PLAIN)
        };
        Self { multi, style }
    }

    fn spinner(&self, message: String) -> ProgressBar {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(self.style.clone());
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    pub fn clear(&self) {
        let _ = self.multi.clear();
    }
}

fn is_dumb_term() -> bool {
    std::env::var("TERM").is_ok_and(|term| term.eq_ignore_ascii_case("dumb"))
}

fn format_stage_message(stage: Stage, label: &str) -> String {
    let prefix = format!("[{}/{}]", stage.index(), STAGE_TOTAL);
    format!(
        "{} {}: {}",
        prefix.bright_yellow().bold(),
        stage.label().bright_cyan().bold(),
        label.bright_white().bold()
    )
}

pub fn run_with_spinner<T, E>(
    progress: &ProgressState,
    stage: Stage,
    label: &str,
    work: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    let bar = progress.spinner(format_stage_message(stage, label));
    let result = work();
    let outcome = match &result {
        Ok(_) => "done".bright_green().bold(),
        Err(_) => "failed".bright_red().bold(),
    };
    bar.finish_with_message(format!("{} {outcome}", format_stage_message(stage, label)));
    result
}
