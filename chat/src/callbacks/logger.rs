use crate::Result;
use crate::callbacks::{Callback, render_turn};
use crate::llm::Turn;
use async_trait::async_trait;
use std::io::Write;

/// Appends the conversation to a markdown log as it grows.
pub struct TranscriptLogger<W: Write + Send> {
    last_hashes: Vec<u64>,
    writer: W,
}

impl<W: Write + Send> TranscriptLogger<W> {
    pub fn new(name: &str, mut writer: W) -> Result<Box<Self>> {
        write!(writer, "## {}\n\n", name)?;

        Ok(Box::new(Self {
            last_hashes: Vec::new(),
            writer,
        }))
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_turns(&mut self, turns: &[Turn]) -> Result<()> {
        turns
            .iter()
            .filter_map(render_turn)
            .try_for_each(|line| write!(self.writer, "{}\n\n", line))?;

        Ok(())
    }

    fn write_history_cleared(&mut self) -> Result<()> {
        write!(self.writer, "## [HISTORY CLEARED]\n\n")?;
        Ok(())
    }

    fn prefix_match_len(&self, new_hashes: &[u64]) -> usize {
        new_hashes
            .iter()
            .zip(self.last_hashes.iter())
            .take_while(|&(a, b)| *a == *b)
            .count()
    }
}

#[async_trait]
impl<W: Write + Send> Callback for TranscriptLogger<W> {
    async fn call(&mut self, turns: Vec<Turn>) -> Result<Vec<Turn>> {
        let new_hashes = turns.iter().map(Turn::get_hash).collect::<Vec<_>>();

        if new_hashes.len() < self.last_hashes.len()
            || self.prefix_match_len(&new_hashes) != self.last_hashes.len()
        {
            self.write_history_cleared()?;
            self.write_turns(&turns)?;
        } else {
            self.write_turns(&turns[self.last_hashes.len()..])?;
        }

        self.writer.flush()?;
        self.last_hashes = new_hashes;

        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(logger: Box<TranscriptLogger<Vec<u8>>>) -> String {
        String::from_utf8(logger.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn only_new_turns_are_written() -> Result<()> {
        let mut logger = TranscriptLogger::new("chat", Vec::new())?;

        let mut turns = logger
            .call(vec![Turn::user("hi"), Turn::assistant("hello")])
            .await?;
        turns.push(Turn::user("bye"));
        logger.call(turns).await?;

        assert_eq!(
            written(logger),
            "## chat\n\n👩‍⚕️: hi\n\n🤓: hello\n\n👩‍⚕️: bye\n\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn replaced_history_is_marked_and_rewritten() -> Result<()> {
        let mut logger = TranscriptLogger::new("chat", Vec::new())?;

        logger
            .call(vec![Turn::user("one"), Turn::assistant("two")])
            .await?;
        logger.call(vec![Turn::user("fresh")]).await?;

        assert_eq!(
            written(logger),
            "## chat\n\n👩‍⚕️: one\n\n🤓: two\n\n## [HISTORY CLEARED]\n\n👩‍⚕️: fresh\n\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn system_turns_are_not_logged() -> Result<()> {
        let mut logger = TranscriptLogger::new("chat", Vec::new())?;

        logger
            .call(vec![Turn::system("be nice"), Turn::user("hi")])
            .await?;

        assert_eq!(written(logger), "## chat\n\n👩‍⚕️: hi\n\n");
        Ok(())
    }
}
