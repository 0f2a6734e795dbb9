pub mod helpers;
mod tests_file;
