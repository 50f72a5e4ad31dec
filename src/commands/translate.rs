/// Commands that are answered by the data tier render themselves into its request grammar.
pub trait Translate {
    fn translate(&self) -> String;
}
