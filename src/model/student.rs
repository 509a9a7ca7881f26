use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, AsRefStr, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": "3f1c2a9e-8d7b-4c61-a0f4-6b2e9d1c5a77",
        "nisn": "1001",
        "full_name": "Alice Johnson",
        "gender": "female",
        "date_of_birth": "2008-05-10",
        "email": "alice@example.com",
        "phone": null,
        "address": null,
        "class_id": "class-1"
    })
)]
pub struct Student {
    pub id: String,

    #[schema(example = "1001")]
    pub nisn: String,

    #[schema(example = "Alice Johnson")]
    pub full_name: String,

    pub gender: Gender,

    #[schema(example = "2008-05-10", value_type = String, format = "date")]
    pub date_of_birth: NaiveDate,

    #[schema(example = "alice@example.com", nullable = true)]
    pub email: Option<String>,

    #[schema(nullable = true)]
    pub phone: Option<String>,

    #[schema(nullable = true)]
    pub address: Option<String>,

    #[schema(example = "class-1")]
    pub class_id: String,
}

/// Fields for a new student; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub nisn: String,
    pub full_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub class_id: String,
}

impl NewStudent {
    pub fn into_student(self, id: String) -> Student {
        Student {
            id,
            nisn: self.nisn,
            full_name: self.full_name,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            email: self.email,
            phone: self.phone,
            address: self.address,
            class_id: self.class_id,
        }
    }
}

/// Partial update. For the optional contact fields the outer `Option` means
/// "leave as is" and `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentPatch {
    pub nisn: Option<String>,
    pub full_name: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub class_id: Option<String>,
}

impl StudentPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, student: &mut Student) {
        if let Some(v) = self.nisn {
            student.nisn = v;
        }
        if let Some(v) = self.full_name {
            student.full_name = v;
        }
        if let Some(v) = self.gender {
            student.gender = v;
        }
        if let Some(v) = self.date_of_birth {
            student.date_of_birth = v;
        }
        if let Some(v) = self.email {
            student.email = v;
        }
        if let Some(v) = self.phone {
            student.phone = v;
        }
        if let Some(v) = self.address {
            student.address = v;
        }
        if let Some(v) = self.class_id {
            student.class_id = v;
        }
    }
}
