use std::{io::Write as _, os::fd::AsFd as _, time::SystemTime};

use anstyle::{AnsiColor, Effects};
use env_logger::Env;

/// `JOURNAL_STREAM` holds `<device>:<inode>` of the stream systemd hands to
/// the service, see `systemd.exec(5)`.
fn names_stream(journal_stream: &str, device: u64, inode: u64) -> bool {
    let Some((dev, ino)) = journal_stream.split_once(':') else {
        return false;
    };
    dev.parse() == Ok(device) && ino.parse() == Ok(inode)
}

/// Whether stderr is the journal stream systemd attached to this process.
fn stderr_is_journal() -> bool {
    let Some(journal_stream) = std::env::var_os("JOURNAL_STREAM") else {
        return false;
    };
    let Ok(stat) = rustix::fs::fstat(std::io::stderr().as_fd()) else {
        return false;
    };
    journal_stream
        .to_str()
        .is_some_and(|stream| names_stream(stream, stat.st_dev as u64, stat.st_ino as u64))
}

/// Sets up the global logger. `RUST_LOG` wins over `default_level`, every
/// line is prefixed with the folder being synced.
pub fn init(folder: Option<&str>, default_level: &str) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(default_level));
    let folder = if let Some(folder) = folder {
        format!("{folder} ")
    } else {
        String::new()
    };
    if stderr_is_journal() {
        builder.format(move |buf, record| {
            writeln!(
                buf,
                "<{}>{}{}: {}",
                match record.level() {
                    log::Level::Error => 3,
                    log::Level::Warn => 4,
                    log::Level::Info => 6,
                    log::Level::Debug | log::Level::Trace => 7,
                },
                folder,
                record.target(),
                record.args()
            )
        });
    } else {
        let subtle = AnsiColor::BrightBlack.on_default();
        builder.format(move |buf, record| {
            write!(buf, "{subtle}[{subtle:#}")?;
            match jiff::Timestamp::try_from(SystemTime::now()) {
                Ok(now) => write!(buf, "{now:.3} ")?,
                Err(_) => write!(buf, "timestamp_error ")?,
            }
            let level_style = match record.level() {
                log::Level::Error => AnsiColor::Red.on_default().effects(Effects::BOLD),
                log::Level::Warn => AnsiColor::Yellow.on_default(),
                log::Level::Info => AnsiColor::Green.on_default(),
                log::Level::Debug => AnsiColor::Blue.on_default(),
                log::Level::Trace => AnsiColor::Cyan.on_default(),
            };
            write!(
                buf,
                "{level_style}{}{level_style:#} {folder}{}",
                record.level(),
                record.target(),
            )?;
            if let Some(line) = record.line() {
                write!(buf, ":{line}")?;
            }
            write!(buf, "{subtle}]{subtle:#} ")?;
            writeln!(buf, "{}", record.args())
        });
    }
    builder.init();
}
