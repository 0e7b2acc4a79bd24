use axum::{
    routing::{delete, get},
    Router,
};
use registry::AppRegistry;

use crate::handler::{
    employee::{delete_employee, register_employee, show_employee_list},
    shop::{delete_shop, register_shop, show_shop_list},
};

pub fn build_shop_routers() -> Router<AppRegistry> {
    Router::new()
        .route(
            "/shops",
            get(show_shop_list).post(register_shop).delete(delete_shop),
        )
        .route("/shops/employees", delete(delete_employee))
        .route(
            "/employees",
            get(show_employee_list)
                .post(register_employee)
                .delete(delete_employee),
        )
}
