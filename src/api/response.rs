//! Response envelopes.

use serde::Serialize;

/// Single-record envelope.
#[derive(Debug, Clone, Serialize)]
pub struct SingleResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> SingleResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Paginated list envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(data: Vec<T>, page: usize, per_page: usize, total: usize) -> Self {
        Self {
            data,
            page,
            per_page,
            total,
        }
    }
}

/// Acknowledgement-only envelope, used by deletes.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_response_serialization() {
        let response = ListResponse::new(vec![json!({"id": 1})], 2, 10, 11);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["page"], 2);
        assert_eq!(value["per_page"], 10);
        assert_eq!(value["total"], 11);
        assert_eq!(value["data"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_single_response_wraps_data() {
        let value = serde_json::to_value(SingleResponse::new(json!({"id": 3}))).unwrap();
        assert_eq!(value["data"]["id"], 3);
    }
}
