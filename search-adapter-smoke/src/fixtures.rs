//! Test documents for the smoke scenarios.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEPARTMENTS: [&str; 4] = ["Engineering", "Sales", "HR", "Marketing"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub salary: u64,
}

/// `count` users with ids `user-0..`, departments in rotation and salaries
/// of `50000 + i * 5000`.
pub fn generate_users(count: usize) -> Vec<User> {
    (0..count)
        .map(|i| User {
            id: format!("user-{}", i),
            name: format!("User {}", i),
            email: format!("user{}@example.com", i),
            department: DEPARTMENTS[i % DEPARTMENTS.len()].to_string(),
            salary: 50_000 + i as u64 * 5_000,
        })
        .collect()
}

/// Number of generated users in `department` whose salary is above `floor`.
pub fn expected_users(count: usize, department: Option<&str>, floor: u64) -> u64 {
    generate_users(count)
        .iter()
        .filter(|u| department.map_or(true, |d| u.department == d))
        .filter(|u| u.salary > floor)
        .count() as u64
}

/// Books, authors and categories sharing one index, told apart by `type`.
pub fn catalog() -> Vec<(String, Value)> {
    vec![
        (
            "book-1".to_string(),
            json!({"type": "book", "title": "The Fantasy Realm", "year": 2019}),
        ),
        (
            "book-2".to_string(),
            json!({"type": "book", "title": "Systems Programming", "year": 2021}),
        ),
        (
            "author-1".to_string(),
            json!({"type": "author", "name": "Fantasy Writer", "born": 1970}),
        ),
        (
            "category-1".to_string(),
            json!({"type": "category", "name": "Science"}),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_users() {
        let users = generate_users(8);
        assert_eq!(users.len(), 8);
        assert_eq!(users[0].id, "user-0");
        assert_eq!(users[5].department, "Sales");
        assert_eq!(users[3].salary, 65_000);
    }

    #[test]
    fn test_expected_users() {
        assert_eq!(expected_users(20, None, 0), 20);
        assert_eq!(expected_users(20, Some("Engineering"), 0), 5);
        assert_eq!(expected_users(20, None, 70_000), 15);
        assert_eq!(expected_users(20, Some("Sales"), 70_000), 4);
    }
}
