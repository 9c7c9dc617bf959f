use indicatif::{ProgressBar, ProgressStyle};

/// イメージビルド中のスピナー
pub struct BuildProgress {
    progress_bar: ProgressBar,
}

impl BuildProgress {
    pub fn new(image: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        pb.set_message(format!("Building {}...", image));

        Self { progress_bar: pb }
    }

    /// ビルド出力の最終行を表示
    pub fn set_message(&self, msg: &str) {
        let line = msg.trim();
        if !line.is_empty() {
            self.progress_bar.set_message(line.to_string());
        }
    }

    pub fn finish_success(&self, image: &str) {
        self.progress_bar
            .finish_with_message(format!("Built {} ✓", image));
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .finish_with_message(format!("Build failed: {}", error));
    }
}
