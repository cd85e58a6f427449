use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stage {
    pub argv: Vec<String>,     // program name followed by its arguments
    pub input: Option<String>,  // < path
    pub output: Option<String>, // > path
}

impl Stage {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            input: None,
            output: None,
        }
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub line: String, // raw command text, kept for history
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(line: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            line: line.into(),
            stages,
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.stages.len().saturating_sub(1);
        for (i, stage) in self.stages.iter().enumerate() {
            writeln!(f, "--------")?;
            writeln!(f, "Stage {}: \"{}\"", i, stage.argv.join(" "))?;
            writeln!(f, "--------")?;

            let input = match (&stage.input, i) {
                (Some(path), _) => path.clone(),
                (None, 0) => "original stdin".to_string(),
                (None, _) => format!("pipe from stage {}", i - 1),
            };
            let output = match &stage.output {
                Some(path) => path.clone(),
                None if i == last => "original stdout".to_string(),
                None => format!("pipe to stage {}", i + 1),
            };
            let argv: Vec<String> = stage.argv.iter().map(|a| format!("\"{}\"", a)).collect();

            writeln!(f, "     input: {}", input)?;
            writeln!(f, "    output: {}", output)?;
            writeln!(f, "      argc: {}", stage.argv.len())?;
            writeln!(f, "      argv: {}", argv.join(","))?;
        }
        Ok(())
    }
}
