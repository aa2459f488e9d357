pub mod conversations;
pub mod trading;
pub mod voice;
