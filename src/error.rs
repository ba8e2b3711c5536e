use std::{error::Error, fmt};

/// Prints an error followed by its whole source chain on a single line.
pub struct ErrorDisplay<'a>(pub &'a dyn Error);

impl fmt::Display for ErrorDisplay<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.0)?;

        let mut current_err = self.0.source();
        while let Some(source) = current_err {
            write!(formatter, ": {}", source)?;
            current_err = source.source();
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer {
        source: Inner,
    }

    #[derive(Debug, Error)]
    #[error("inner")]
    struct Inner;

    #[test]
    fn chases_sources() {
        let err = Outer { source: Inner };
        assert_eq!(ErrorDisplay(&err).to_string(), "outer: inner");
    }
}
