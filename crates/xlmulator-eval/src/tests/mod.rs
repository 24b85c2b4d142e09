mod actions;
mod interpreter;
mod logs;
