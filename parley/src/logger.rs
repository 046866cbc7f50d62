use std::fmt::Write;

use jiff::{Zoned, tz::TimeZone};
use log::Record;
use logforth::{
    append::Stdout,
    layout::{JsonLayout, Layout},
};

use crate::args::{Args, LogStyle};

#[derive(Debug, Clone, Default)]
struct TextLayout {
    no_color: bool,
}

impl Layout for TextLayout {
    fn format(
        &self,
        record: &Record<'_>,
        _diagnostics: &[Box<dyn logforth::diagnostic::Diagnostic>],
    ) -> anyhow::Result<Vec<u8>> {
        let mut output = String::new();
        let now = Zoned::now().with_time_zone(TimeZone::UTC);

        write!(output, "{} ", now.strftime("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let color = match record.level() {
            log::Level::Error => 31,
            log::Level::Warn => 33,
            log::Level::Info => 32,
            log::Level::Debug => 34,
            log::Level::Trace => 35,
        };

        if self.no_color {
            write!(output, "{:>5}  ", record.level())?;
        } else {
            write!(output, "\x1b[{color}m{:>5}\x1b[0m  ", record.level())?;
        }

        write!(output, "{}", record.args())?;

        Ok(output.into_bytes())
    }
}

pub(super) fn init(args: &Args) -> anyhow::Result<()> {
    let filter = args.log_level.env_filter()?;

    logforth::builder()
        .dispatch(|d| {
            let d = d.filter(filter);

            match args.log_style {
                LogStyle::Color => d.append(Stdout::default().with_layout(TextLayout::default())),
                LogStyle::Text => d.append(Stdout::default().with_layout(TextLayout { no_color: true })),
                LogStyle::Json => d.append(Stdout::default().with_layout(JsonLayout::default())),
            }
        })
        .apply();

    Ok(())
}
