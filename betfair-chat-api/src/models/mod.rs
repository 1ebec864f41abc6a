pub mod error;
pub mod messages;
pub mod openai;

#[cfg(test)]
mod tests;
