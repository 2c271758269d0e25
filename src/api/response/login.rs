use crate::model::Plant;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
pub struct User {
    #[serde(deserialize_with = "super::string_or_number")]
    pub id: String,
    pub rightlevel: Option<i64>,
}

/// `back` object of `newTwoLoginAPI.do`.
#[derive(Deserialize)]
pub struct Login {
    pub success: bool,
    pub msg: Option<Value>,
    pub error: Option<String>,
    #[serde(default)]
    pub data: Vec<Plant>,
    pub user: Option<User>,
}

impl Login {
    pub fn error_message(&self) -> String {
        match (&self.error, &self.msg) {
            (Some(error), _) => error.to_owned(),
            (None, Some(msg)) => crate::model::value_to_string(msg),
            (None, None) => String::from("(no error message received)"),
        }
    }
}
