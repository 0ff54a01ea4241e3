use std::collections::BTreeMap;

pub const RETURN_CODE_SUCCESS: &str = "SUCCESS";
pub const RESULT_CODE_SUCCESS: &str = "SUCCESS";

/// Verified reply of a pay endpoint.
///
/// Only produced once `return_code` is `SUCCESS` and the signature checks
/// out. The business outcome (`result_code`) is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayResponse {
    fields: BTreeMap<String, String>,
}

impl PayResponse {
    pub(crate) fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn return_msg(&self) -> Option<&str> {
        self.get("return_msg")
    }

    pub fn result_code(&self) -> Option<&str> {
        self.get("result_code")
    }

    pub fn is_business_success(&self) -> bool {
        self.result_code() == Some(RESULT_CODE_SUCCESS)
    }

    pub fn err_code(&self) -> Option<&str> {
        self.get("err_code")
    }

    pub fn err_code_des(&self) -> Option<&str> {
        self.get("err_code_des")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_outcome() {
        let mut fields = BTreeMap::new();
        fields.insert("return_code".to_string(), "SUCCESS".to_string());
        fields.insert("result_code".to_string(), "FAIL".to_string());
        fields.insert("err_code".to_string(), "ORDERPAID".to_string());
        fields.insert("err_code_des".to_string(), "order paid".to_string());

        let response = PayResponse::new(fields);
        assert!(!response.is_business_success());
        assert_eq!(response.err_code(), Some("ORDERPAID"));
        assert_eq!(response.err_code_des(), Some("order paid"));
        assert_eq!(response.get("missing"), None);
    }
}
