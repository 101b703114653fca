pub mod booking;
pub mod company;
pub mod notification;
pub mod payment;
pub mod payment_method;
pub mod rol;
pub mod route;
pub mod seat;
pub mod seat_type;
pub mod ship;
pub mod trip;
pub mod trip_seat;
pub mod user;
pub mod user_company;
