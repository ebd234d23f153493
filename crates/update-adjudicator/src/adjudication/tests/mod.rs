mod common;
mod domain;
mod routing;
