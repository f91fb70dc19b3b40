/// Abstraction over user-facing output.
///
/// Command modules print through this trait; diagnostics go through
/// `tracing` on stderr instead.
pub trait UserOutput: Send + Sync {
    fn status(&self, message: &str);

    fn success(&self, message: &str);

    fn warning(&self, message: &str);

    fn error(&self, message: &str);

    /// One line per service: `  name  detail`.
    fn service_line(&self, name: &str, detail: &str) {
        self.status(&format!("  {:<20} {}", name, detail));
    }
}

/// Standard CLI output: stdout for results, stderr for problems.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("\x1b[32m{}\x1b[0m", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("\x1b[33m{}\x1b[0m", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[31m{}\x1b[0m", message);
    }
}
