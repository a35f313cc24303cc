use super::ComposeError;
use std::collections::HashMap;
use std::io::{BufRead, Write};

/// Source of answers for decisions a descriptor leaves open.
pub trait Prompt: Send + Sync {
    /// Picks one of `options`, returning its index.
    fn choose(&self, question: &str, options: &[String]) -> Result<usize, ComposeError>;

    /// Asks for a free-form value.
    fn input(&self, question: &str) -> Result<String, ComposeError>;
}

/// Fails every question. Used when no terminal is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl Prompt for NonInteractive {
    fn choose(&self, question: &str, _options: &[String]) -> Result<usize, ComposeError> {
        Err(ComposeError::PromptRequired(question.to_string()))
    }

    fn input(&self, question: &str) -> Result<String, ComposeError> {
        Err(ComposeError::PromptRequired(question.to_string()))
    }
}

/// Answers given up front, keyed by the question text. Unanswered
/// questions fail like [`NonInteractive`].
#[derive(Debug, Default, Clone)]
pub struct Preset {
    choices: HashMap<String, String>,
    inputs: HashMap<String, String>,
}

impl Preset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers a choice with the option whose text equals `answer`.
    pub fn with_choice(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.choices.insert(question.into(), answer.into());
        self
    }

    pub fn with_input(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.inputs.insert(question.into(), answer.into());
        self
    }
}

impl Prompt for Preset {
    fn choose(&self, question: &str, options: &[String]) -> Result<usize, ComposeError> {
        self.choices
            .get(question)
            .and_then(|answer| options.iter().position(|o| o == answer))
            .ok_or_else(|| ComposeError::PromptRequired(question.to_string()))
    }

    fn input(&self, question: &str) -> Result<String, ComposeError> {
        self.inputs
            .get(question)
            .cloned()
            .ok_or_else(|| ComposeError::PromptRequired(question.to_string()))
    }
}

/// Asks on stderr and reads answers from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl Prompt for Terminal {
    fn choose(&self, question: &str, options: &[String]) -> Result<usize, ComposeError> {
        ask_choice(
            &mut std::io::stdin().lock(),
            &mut std::io::stderr().lock(),
            question,
            options,
        )
    }

    fn input(&self, question: &str) -> Result<String, ComposeError> {
        ask_input(
            &mut std::io::stdin().lock(),
            &mut std::io::stderr().lock(),
            question,
        )
    }
}

fn read_answer(reader: &mut impl BufRead, question: &str) -> Result<String, ComposeError> {
    let mut line = String::new();
    if reader.read_line(&mut line).map_err(ComposeError::Terminal)? == 0 {
        return Err(ComposeError::PromptRequired(question.to_string()));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn ask_choice(
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    question: &str,
    options: &[String],
) -> Result<usize, ComposeError> {
    writeln!(writer, "{}", question).map_err(ComposeError::Terminal)?;
    for (i, option) in options.iter().enumerate() {
        writeln!(writer, "  {}) {}", i + 1, option).map_err(ComposeError::Terminal)?;
    }
    loop {
        write!(writer, "Select [1-{}]: ", options.len()).map_err(ComposeError::Terminal)?;
        writer.flush().map_err(ComposeError::Terminal)?;
        let answer = read_answer(reader, question)?;
        match answer.trim().parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
            _ => {
                if let Some(i) = options.iter().position(|o| o == answer.trim()) {
                    return Ok(i);
                }
            }
        }
    }
}

fn ask_input(
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    question: &str,
) -> Result<String, ComposeError> {
    write!(writer, "{}: ", question).map_err(ComposeError::Terminal)?;
    writer.flush().map_err(ComposeError::Terminal)?;
    read_answer(reader, question)
}
