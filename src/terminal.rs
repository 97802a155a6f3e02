use std::{
    fmt::Debug,
    io::{BufRead, Write},
};

use miette::{Context, IntoDiagnostic};

use crate::result::{bail, Result};

/// Line based questions asked to the user
pub trait Prompter: Sync + Send + Debug {
    /// Print the question and return the trimmed answer
    fn ask(&self, question: &str) -> Result<String>;

    /// Yes/no question, anything but a yes is a no
    fn confirm(&self, question: &str) -> Result<bool> {
        let answer = self.ask(&format!("{question} (y/n): "))?;
        Ok(is_yes(&answer))
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "s" | "si" | "sí"
    )
}

/// Questions asked on stdin/stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl Prompter for Terminal {
    fn ask(&self, question: &str) -> Result<String> {
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{question}")
            .and_then(|()| stdout.flush())
            .into_diagnostic()
            .wrap_err("Could not write to the terminal")?;

        let mut line = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .into_diagnostic()
            .wrap_err("Could not read from the terminal")?;

        if read == 0 {
            return bail("The terminal input was closed");
        }
        Ok(line.trim().to_owned())
    }
}

#[cfg(test)]
pub mod testing {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;
    use crate::{result::err_msg, utils::MutexUtils};

    /// Answers questions from a predefined script, recording them
    #[derive(Debug, Default)]
    pub struct Scripted {
        answers: Mutex<VecDeque<String>>,
        pub asked: Mutex<Vec<String>>,
    }

    impl Scripted {
        pub fn new<I, S>(answers: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
                asked: Mutex::default(),
            }
        }

        pub fn questions(&self) -> usize {
            self.asked.with_lock(|asked| asked.len())
        }
    }

    impl Prompter for Scripted {
        fn ask(&self, question: &str) -> Result<String> {
            self.asked
                .with_lock(|mut asked| asked.push(question.to_owned()));
            self.answers
                .with_lock(|mut answers| answers.pop_front())
                .ok_or_else(|| err_msg("No more scripted answers"))
        }
    }
}
