mod common;

mod history;
