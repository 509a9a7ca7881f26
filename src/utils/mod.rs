pub mod db_utils;
pub mod nisn_index;
pub mod validation;
