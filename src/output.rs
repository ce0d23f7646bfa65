use chrono::Local;
use std::io::Write;

/// Writes rendered value lines, one write per line.
pub struct Printer<W: Write> {
    out: W,
    timestamps: bool,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            timestamps: false,
        }
    }

    /// Prefix every line with the local wall clock time (`HH:MM:SS.fff`).
    pub fn with_timestamps(out: W) -> Self {
        Self {
            out,
            timestamps: true,
        }
    }

    pub fn print(&mut self, lines: &[String]) -> std::io::Result<()> {
        for line in lines {
            if self.timestamps {
                writeln!(self.out, "{} {}", Local::now().format("%H:%M:%S%.3f"), line)?;
            } else {
                writeln!(self.out, "{}", line)?;
            }
            self.out.flush()?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::Printer;

    #[test]
    fn ut_plain() {
        let mut printer = Printer::new(Vec::new());
        printer
            .print(&["a".to_owned(), "b".to_owned()])
            .unwrap();
        assert_eq!(String::from_utf8(printer.into_inner()).unwrap(), "a\nb\n");
    }

    #[test]
    fn ut_timestamps() {
        let mut printer = Printer::with_timestamps(Vec::new());
        printer.print(&["Value of coil[0] = true".to_owned()]).unwrap();
        let out = String::from_utf8(printer.into_inner()).unwrap();
        let (stamp, line) = out.trim_end().split_once(' ').unwrap();
        assert_eq!(line, "Value of coil[0] = true");
        // HH:MM:SS.fff
        assert_eq!(stamp.len(), 12);
        assert_eq!(&stamp[2..3], ":");
        assert_eq!(&stamp[8..9], ".");
    }
}
