mod support;

mod chat;
mod images;
