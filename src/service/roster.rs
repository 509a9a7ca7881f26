use crate::model::student::{Gender, NewStudent, Student, StudentPatch};
use crate::store::{RosterStore, StoreError, mysql::is_duplicate_key};
use crate::utils::nisn_index::NisnIndex;
use crate::utils::validation::{FieldErrors, is_valid_email, optional_text, parse_field, require};
use chrono::NaiveDate;
use derive_more::Display;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

/// Missing or `null` fields are reported as validation errors, not
/// rejected by the JSON extractor.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateStudent {
    #[schema(example = "1001", value_type = String)]
    pub nisn: Option<String>,
    #[schema(example = "Alice Johnson", value_type = String)]
    pub full_name: Option<String>,
    #[schema(value_type = Gender)]
    pub gender: Option<String>,
    #[schema(example = "2008-05-10", format = "date", value_type = String)]
    pub date_of_birth: Option<String>,
    #[schema(example = "alice@example.com", format = "email", nullable = true)]
    pub email: Option<String>,
    #[schema(nullable = true)]
    pub phone: Option<String>,
    #[schema(nullable = true)]
    pub address: Option<String>,
    #[schema(example = "class-1", value_type = String)]
    pub class_id: Option<String>,
}

/// Omitted fields are left unchanged. An empty string clears
/// `email`, `phone` or `address`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateStudent {
    pub nisn: Option<String>,
    pub full_name: Option<String>,
    #[schema(value_type = Option<Gender>)]
    pub gender: Option<String>,
    #[schema(example = "2008-05-10", format = "date", value_type = Option<String>)]
    pub date_of_birth: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub class_id: Option<String>,
}

const GENDER_INVALID: &str = "Gender must be 'male' or 'female'";
const DATE_INVALID: &str = "Date of birth must be a valid date (YYYY-MM-DD)";

fn trimmed(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

#[derive(Debug, Display)]
pub enum RosterError {
    #[display(fmt = "Invalid input")]
    Validation(FieldErrors),
    #[display(fmt = "A student with this NISN already exists")]
    DuplicateNisn,
    #[display(fmt = "Student not found")]
    NotFound,
    #[display(fmt = "Roster operation failed")]
    Persistence(StoreError),
}

impl std::error::Error for RosterError {}

impl From<StoreError> for RosterError {
    fn from(e: StoreError) -> Self {
        match e {
            // the UNIQUE index caught a NISN race the index could not see
            StoreError::Database(ref db) if is_duplicate_key(db) => RosterError::DuplicateNisn,
            e => RosterError::Persistence(e),
        }
    }
}

/// A NISN race lost on the UNIQUE index is an expected conflict, not a
/// store failure.
fn store_failure(e: StoreError, action: &'static str, student_id: Option<&str>) -> RosterError {
    match RosterError::from(e) {
        RosterError::DuplicateNisn => {
            warn!(action, student_id, "NISN taken by a concurrent write");
            RosterError::DuplicateNisn
        }
        RosterError::Persistence(e) => {
            error!(error = %e, action, student_id, "Roster store failure");
            RosterError::Persistence(e)
        }
        other => other,
    }
}

fn check_email(errors: &mut FieldErrors, email: Option<&str>) {
    if let Some(email) = email {
        if !is_valid_email(email) {
            errors.insert("email", "Invalid email address".to_string());
        }
    }
}

/// Student CRUD with field validation and NISN uniqueness.
#[derive(Clone)]
pub struct RosterService {
    roster: Arc<dyn RosterStore>,
    index: Arc<NisnIndex>,
}

impl RosterService {
    pub fn new(roster: Arc<dyn RosterStore>, index: Arc<NisnIndex>) -> Self {
        Self { roster, index }
    }

    async fn ensure_class(&self, errors: &mut FieldErrors, class_id: &str) -> Result<(), RosterError> {
        if !class_id.is_empty() && self.roster.get_class(class_id).await?.is_none() {
            errors.insert("class_id", "Class not found".to_string());
        }
        Ok(())
    }

    /// Fails when `nisn` belongs to a student other than `own_id`.
    async fn ensure_nisn_free(&self, nisn: &str, own_id: Option<&str>) -> Result<(), RosterError> {
        match self.index.owner_of(nisn, self.roster.as_ref()).await? {
            Some(owner) if Some(owner.as_str()) != own_id => Err(RosterError::DuplicateNisn),
            _ => Ok(()),
        }
    }

    pub async fn list(&self) -> Result<Vec<Student>, RosterError> {
        Ok(self.roster.list_students().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Student, RosterError> {
        self.roster.get_student(id).await?.ok_or(RosterError::NotFound)
    }

    pub async fn create(&self, input: CreateStudent) -> Result<Student, RosterError> {
        let mut errors = FieldErrors::new();

        let nisn = trimmed(input.nisn.as_deref());
        let full_name = trimmed(input.full_name.as_deref());
        let class_id = trimmed(input.class_id.as_deref());
        let email = optional_text(input.email.as_deref());

        require(&mut errors, "nisn", &nisn, "NISN is required");
        require(&mut errors, "full_name", &full_name, "Full name is required");
        require(&mut errors, "class_id", &class_id, "Class is required");
        require(&mut errors, "gender", &trimmed(input.gender.as_deref()), "Gender is required");
        require(
            &mut errors,
            "date_of_birth",
            &trimmed(input.date_of_birth.as_deref()),
            "Date of birth is required",
        );
        let gender = parse_field::<Gender>(&mut errors, "gender", input.gender.as_deref(), GENDER_INVALID);
        let date_of_birth =
            parse_field::<NaiveDate>(&mut errors, "date_of_birth", input.date_of_birth.as_deref(), DATE_INVALID);
        check_email(&mut errors, email.as_deref());
        self.ensure_class(&mut errors, &class_id).await?;

        let (Some(gender), Some(date_of_birth), true) = (gender, date_of_birth, errors.is_empty()) else {
            return Err(RosterError::Validation(errors));
        };

        let new = NewStudent {
            nisn,
            full_name,
            gender,
            date_of_birth,
            email,
            phone: optional_text(input.phone.as_deref()),
            address: optional_text(input.address.as_deref()),
            class_id,
        };

        self.ensure_nisn_free(&new.nisn, None).await?;

        let student = self
            .roster
            .create_student(new)
            .await
            .map_err(|e| store_failure(e, "create", None))?;
        self.index.record(&student.nisn, &student.id).await;

        info!(student_id = %student.id, nisn = %student.nisn, "Student created");
        Ok(student)
    }

    pub async fn update(&self, id: &str, input: UpdateStudent) -> Result<Student, RosterError> {
        let current = self.get(id).await?;

        let mut errors = FieldErrors::new();

        let patch = StudentPatch {
            nisn: input.nisn.map(|v| v.trim().to_string()),
            full_name: input.full_name.map(|v| v.trim().to_string()),
            gender: parse_field(&mut errors, "gender", input.gender.as_deref(), GENDER_INVALID),
            date_of_birth: parse_field(
                &mut errors,
                "date_of_birth",
                input.date_of_birth.as_deref(),
                DATE_INVALID,
            ),
            email: input.email.map(|v| optional_text(Some(&v))),
            phone: input.phone.map(|v| optional_text(Some(&v))),
            address: input.address.map(|v| optional_text(Some(&v))),
            class_id: input.class_id.map(|v| v.trim().to_string()),
        };

        if let Some(nisn) = &patch.nisn {
            require(&mut errors, "nisn", nisn, "NISN is required");
        }
        if let Some(name) = &patch.full_name {
            require(&mut errors, "full_name", name, "Full name is required");
        }
        if let Some(class_id) = &patch.class_id {
            require(&mut errors, "class_id", class_id, "Class is required");
            self.ensure_class(&mut errors, class_id).await?;
        }
        check_email(&mut errors, patch.email.as_ref().and_then(|e| e.as_deref()));
        if patch.is_empty() && errors.is_empty() {
            errors.insert("body", "No fields provided for update".to_string());
        }
        if !errors.is_empty() {
            return Err(RosterError::Validation(errors));
        }

        let new_nisn = patch.nisn.clone().filter(|n| *n != current.nisn);
        if let Some(nisn) = &new_nisn {
            self.ensure_nisn_free(nisn, Some(id)).await?;
        }

        let updated = self
            .roster
            .update_student(id, patch)
            .await
            .map_err(|e| store_failure(e, "update", Some(id)))?
            .ok_or(RosterError::NotFound)?;

        if new_nisn.is_some() {
            self.index.forget(&current.nisn).await;
            self.index.record(&updated.nisn, &updated.id).await;
        }

        info!(student_id = id, "Student updated");
        Ok(updated)
    }

    /// Returns whether the student existed.
    pub async fn delete(&self, id: &str) -> Result<bool, RosterError> {
        let Some(current) = self.roster.get_student(id).await? else {
            return Ok(false);
        };

        let removed = self
            .roster
            .delete_student(id)
            .await
            .map_err(|e| store_failure(e, "delete", Some(id)))?;

        if removed {
            self.index.forget(&current.nisn).await;
            info!(student_id = id, "Student deleted");
        }
        Ok(removed)
    }
}
