mod initialize;
mod messages;
