//! Field-level checks on request bodies, run by handlers before a service
//! sees the input. Services only enforce cross-entity rules.

use crate::error::ApiError;
use crate::models::{
    CategoryInput, CategoryPatch, ChangePasswordInput, LoginInput, ProductInput, ProductPatch,
    ProfilePatch, RatingInput, RegisterInput, UserPatch,
};

pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

fn fail(msg: &str) -> Result<(), ApiError> {
    Err(ApiError::validation(msg))
}

fn length_between(value: &str, min: usize, max: usize) -> bool {
    let n = value.trim().chars().count();
    n >= min && n <= max
}

fn is_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn is_url(value: &str) -> bool {
    let value = value.trim();
    (value.starts_with("http://") || value.starts_with("https://"))
        && value.split_once("://").map_or(false, |(_, rest)| !rest.is_empty())
}

fn non_negative(value: Option<f64>) -> bool {
    value.map_or(true, |v| v.is_finite() && v >= 0.0)
}

impl Validate for RegisterInput {
    fn validate(&self) -> Result<(), ApiError> {
        if !length_between(&self.name, 2, 50) {
            return fail("Name must be between 2 and 50 characters");
        }
        if !is_email(&self.email) {
            return fail("Please provide a valid email");
        }
        if self.password.chars().count() < 6 {
            return fail("Password must be at least 6 characters long");
        }
        if let Some(role) = &self.role {
            if role != "user" && role != "admin" {
                return fail("Role must be either user or admin");
            }
        }
        Ok(())
    }
}

impl Validate for LoginInput {
    fn validate(&self) -> Result<(), ApiError> {
        if !is_email(&self.email) {
            return fail("Please provide a valid email");
        }
        if self.password.is_empty() {
            return fail("Password is required");
        }
        Ok(())
    }
}

impl Validate for ProfilePatch {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            if !length_between(name, 2, 50) {
                return fail("Name must be between 2 and 50 characters");
            }
        }
        if let Some(phone) = &self.phone {
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            let allowed = phone
                .trim()
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
            if !allowed || !(7..=15).contains(&digits) {
                return fail("Please provide a valid phone number");
            }
        }
        Ok(())
    }
}

impl Validate for ChangePasswordInput {
    fn validate(&self) -> Result<(), ApiError> {
        if self.current_password.is_empty() {
            return fail("Current password is required");
        }
        if self.new_password.chars().count() < 6 {
            return fail("New password must be at least 6 characters long");
        }
        Ok(())
    }
}

impl Validate for UserPatch {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            if !length_between(name, 2, 50) {
                return fail("Name must be between 2 and 50 characters");
            }
        }
        if let Some(email) = &self.email {
            if !is_email(email) {
                return fail("Please provide a valid email");
            }
        }
        Ok(())
    }
}

fn check_category_fields(
    name: Option<&str>,
    description: Option<&str>,
    image: Option<&str>,
) -> Result<(), ApiError> {
    if let Some(name) = name {
        if !length_between(name, 2, 50) {
            return fail("Category name must be between 2 and 50 characters");
        }
    }
    if let Some(description) = description {
        if description.trim().chars().count() > 200 {
            return fail("Description cannot exceed 200 characters");
        }
    }
    if let Some(image) = image {
        if !image.trim().is_empty() && !is_url(image) {
            return fail("Image must be a valid URL");
        }
    }
    Ok(())
}

impl Validate for CategoryInput {
    fn validate(&self) -> Result<(), ApiError> {
        check_category_fields(
            Some(&self.name),
            self.description.as_deref(),
            self.image.as_deref(),
        )
    }
}

impl Validate for CategoryPatch {
    fn validate(&self) -> Result<(), ApiError> {
        check_category_fields(
            self.name.as_deref(),
            self.description.as_deref(),
            self.image.as_deref(),
        )
    }
}

struct ProductFields<'a> {
    name: Option<&'a str>,
    description: Option<&'a str>,
    price: Option<f64>,
    compare_price: Option<f64>,
    stock: Option<i64>,
    sku: Option<&'a str>,
    weight: Option<f64>,
    images: Option<&'a [String]>,
}

fn check_product_fields(f: ProductFields<'_>) -> Result<(), ApiError> {
    if let Some(name) = f.name {
        if !length_between(name, 2, 100) {
            return fail("Product name must be between 2 and 100 characters");
        }
    }
    if let Some(description) = f.description {
        if description.trim().is_empty() {
            return fail("Product description is required");
        }
    }
    if !non_negative(f.price) {
        return fail("Price must be a positive number");
    }
    if !non_negative(f.compare_price) {
        return fail("Compare price cannot be negative");
    }
    if f.stock.map_or(false, |s| s < 0) {
        return fail("Stock must be a non-negative integer");
    }
    if f.sku.map_or(false, |s| s.trim().is_empty()) {
        return fail("SKU cannot be empty if provided");
    }
    if !non_negative(f.weight) {
        return fail("Weight must be a positive number");
    }
    if f.images.map_or(false, |imgs| imgs.iter().any(|i| !is_url(i))) {
        return fail("Images must be valid URLs");
    }
    Ok(())
}

impl Validate for ProductInput {
    fn validate(&self) -> Result<(), ApiError> {
        if self.category.trim().is_empty() {
            return fail("Valid category ID is required");
        }
        check_product_fields(ProductFields {
            name: Some(&self.name),
            description: Some(&self.description),
            price: Some(self.price),
            compare_price: self.compare_price,
            stock: Some(self.stock),
            sku: self.sku.as_deref(),
            weight: self.weight,
            images: Some(&self.images),
        })
    }
}

impl Validate for ProductPatch {
    fn validate(&self) -> Result<(), ApiError> {
        if self.category.as_deref().map_or(false, |c| c.trim().is_empty()) {
            return fail("Valid category ID is required");
        }
        check_product_fields(ProductFields {
            name: self.name.as_deref(),
            description: self.description.as_deref(),
            price: self.price,
            compare_price: self.compare_price,
            stock: self.stock,
            sku: self.sku.as_deref(),
            weight: self.weight,
            images: self.images.as_deref(),
        })
    }
}

impl Validate for RatingInput {
    fn validate(&self) -> Result<(), ApiError> {
        if !(1..=5).contains(&self.rating) {
            return fail("Rating must be between 1 and 5");
        }
        if let Some(review) = &self.review {
            if review.trim().chars().count() > 500 {
                return fail("Review cannot exceed 500 characters");
            }
        }
        Ok(())
    }
}
