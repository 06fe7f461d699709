use std::io::Write;
use std::thread;

use env_logger::{Builder, Env};
use termcolor::{Color, ColorSpec, WriteColor};

pub use log::{debug, error, info, trace, warn};

pub const DEFAULT_FILTER: &str = "ember=info";

pub fn init_logger() {
    init_logger_with_filter(DEFAULT_FILTER);
}

/// Installs the colorized logger. Each record carries the name of the thread
/// it was emitted from, which for engine work is the execution context
/// (`ember.ui`, `ember.io`, ...). `RUST_LOG` overrides `default_filter`.
pub fn init_logger_with_filter(default_filter: &str) {
    let mut builder =
        Builder::from_env(Env::default().default_filter_or(default_filter));

    builder.format(|_buf, record| {
        let writer =
            termcolor::BufferWriter::stdout(termcolor::ColorChoice::Auto);
        let mut buffer = writer.buffer();
        let mut spec = ColorSpec::new();

        spec.set_fg(Some(match record.level() {
            log::Level::Trace => Color::Cyan,
            log::Level::Debug => Color::Blue,
            log::Level::Info => Color::Green,
            log::Level::Warn => Color::Yellow,
            log::Level::Error => Color::Red,
        }));

        buffer.set_color(&spec)?;
        let current = thread::current();
        let thread_name = current.name().unwrap_or("<unnamed>");
        let module_path = record.module_path().unwrap_or("<unknown>");
        write!(
            buffer,
            "[{}][{}][{}]",
            record.level(),
            thread_name,
            module_path
        )?;
        buffer.reset()?;
        writeln!(buffer, " {}", record.args())?;
        writer.print(&buffer)?;
        Ok(())
    });

    let _ = builder.try_init();
}
