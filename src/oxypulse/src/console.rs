use indicatif::{ProgressBar, ProgressStyle};
use oxypulse::{Notice, NoticeLevel, SessionObserver, SessionStatus};
use oxypulse_algos::Classification;
use oxypulse_types::{Channel, Countdown, SessionReport};

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>12} [{wide_bar:.cyan/dim}] {pos}/{len}s {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

/// Renders the countdown as a progress bar and live readings as its message.
#[derive(Default)]
pub struct ConsoleObserver {
    bar: Option<ProgressBar>,
}

impl ConsoleObserver {
    fn print(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }

    fn finish_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl SessionObserver for ConsoleObserver {
    fn state(&mut self, status: &SessionStatus) {
        if let Some(bar) = &self.bar {
            bar.set_prefix(status.state.to_string());
        }
    }

    fn sample(&mut self, classification: &Classification) {
        let Some(bar) = &self.bar else {
            return;
        };

        let reading = |channel| match classification.plausible(channel) {
            Some(value) => format!("{value:.1}"),
            None => "--".to_owned(),
        };

        let finger = match classification.finger_present() {
            true => "",
            false => " (no finger)",
        };
        bar.set_message(format!(
            "BPM {} SpO2 {}%{}",
            reading(Channel::Bpm),
            reading(Channel::SpO2),
            finger
        ));
    }

    fn countdown(&mut self, countdown: Countdown) {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(u64::from(countdown.total()));
            bar.set_style(bar_style());
            bar.set_prefix("Monitoring");
            bar
        });
        bar.set_position(u64::from(countdown.elapsed()));
    }

    fn notice(&mut self, notice: &Notice) {
        let line = match notice.level {
            NoticeLevel::Info => notice.message.clone(),
            NoticeLevel::Warning => format!("warning: {}", notice.message),
            NoticeLevel::Error => format!("error: {}", notice.message),
        };
        self.print(line);

        if notice.level == NoticeLevel::Error {
            self.finish_bar();
        }
    }

    fn finished(&mut self, report: &SessionReport) {
        self.finish_bar();
        println!("{}", report);
    }
}
