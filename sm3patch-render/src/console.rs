/// Severity of a console line; the presentation layer maps it to a colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLevel {
    /// Stage separator.
    Banner,
    Info,
    Warn,
    Error,
    /// A line forwarded from a child process.
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleRecord {
    pub level: RecordLevel,
    pub text: String,
}

impl ConsoleRecord {
    pub fn new(level: RecordLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    /// `=============== Step N ===============`
    pub fn banner(stage: usize) -> Self {
        Self::new(
            RecordLevel::Banner,
            format!("=============== Step {stage} ==============="),
        )
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(RecordLevel::Info, text)
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(RecordLevel::Warn, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(RecordLevel::Error, text)
    }

    pub fn output(text: impl Into<String>) -> Self {
        Self::new(RecordLevel::Output, text)
    }
}
