pub mod calendar;
pub mod directory;
pub mod todo;

#[cfg(test)]
pub(crate) mod test_util;
