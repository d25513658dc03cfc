mod common;
mod transmission;
