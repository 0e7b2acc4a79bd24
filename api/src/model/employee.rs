use derive_new::new;
use garde::Validate;
use kernel::model::{
    employee::Employee,
    id::ShopId,
    shop::event::{AddEmployee, RemoveEmployee},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Validate)]
pub struct AddEmployeeRequest {
    #[garde(skip)]
    pub shop_id: ShopId,
    #[garde(email)]
    pub employee_email: String,
    #[garde(length(min = 1))]
    pub employee_name: String,
    #[garde(skip)]
    #[serde(default)]
    pub hourly_rate: f64,
}

#[derive(new)]
pub struct AddEmployeeRequestWithEmployer(String, AddEmployeeRequest);

impl From<AddEmployeeRequestWithEmployer> for AddEmployee {
    fn from(value: AddEmployeeRequestWithEmployer) -> Self {
        let AddEmployeeRequestWithEmployer(
            employer,
            AddEmployeeRequest {
                shop_id,
                employee_email,
                employee_name,
                hourly_rate,
            },
        ) = value;
        AddEmployee::new(employer, shop_id, employee_email, employee_name, hourly_rate)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RemoveEmployeeRequest {
    #[garde(skip)]
    pub shop_id: ShopId,
    #[garde(length(min = 1))]
    pub employee_email: String,
}

#[derive(new)]
pub struct RemoveEmployeeRequestWithEmployer(String, RemoveEmployeeRequest);

impl From<RemoveEmployeeRequestWithEmployer> for RemoveEmployee {
    fn from(value: RemoveEmployeeRequestWithEmployer) -> Self {
        let RemoveEmployeeRequestWithEmployer(
            employer,
            RemoveEmployeeRequest {
                shop_id,
                employee_email,
            },
        ) = value;
        RemoveEmployee::new(employer, shop_id, employee_email)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeResponse {
    pub email: String,
    pub name: String,
    pub hourly_rate: f64,
}

impl From<Employee> for EmployeeResponse {
    fn from(value: Employee) -> Self {
        let Employee {
            email,
            name,
            hourly_rate,
        } = value;
        Self {
            email,
            name,
            hourly_rate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmployeesResponse {
    pub employees: Vec<EmployeeResponse>,
}

/// Roster keyed by email, the shape schedule views embed.
pub fn employee_map(roster: Vec<Employee>) -> BTreeMap<String, EmployeeResponse> {
    roster
        .into_iter()
        .map(|e| (e.email.clone(), EmployeeResponse::from(e)))
        .collect()
}
