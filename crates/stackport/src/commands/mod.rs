pub mod site;
pub mod stack;
pub mod vm;
