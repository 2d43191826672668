pub(crate) mod cursor;
pub(crate) mod message_layout;
pub(crate) mod records;
pub(crate) mod strings;
