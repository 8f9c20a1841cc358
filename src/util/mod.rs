pub(crate) mod str_utils;
