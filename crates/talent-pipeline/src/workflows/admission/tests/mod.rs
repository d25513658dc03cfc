mod common;
mod matcher;
mod routing;
