use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::{auth, booking, company, fleet, network, notifications};
use crate::middleware::auth::{auth_middleware, write_auth_middleware};
use crate::middleware::rate_limit::{create_public_governor, create_user_governor};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Register/login get the tightest per-IP limits
    let public_governor = create_public_governor();
    let user_governor = create_user_governor();

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/token/refresh", post(auth::refresh))
        .layer(public_governor);

    // Master data: anyone may read, writes need an authenticated caller
    let directory_routes = Router::new()
        .route(
            "/companies",
            get(company::list_companies).post(company::create_company),
        )
        .route(
            "/companies/{id}",
            get(company::get_company)
                .put(company::update_company)
                .delete(company::delete_company),
        )
        .route("/roles", get(company::list_roles).post(company::create_rol))
        .route(
            "/roles/{id}",
            get(company::get_rol)
                .put(company::update_rol)
                .delete(company::delete_rol),
        )
        .route("/ships", get(fleet::list_ships).post(fleet::create_ship))
        .route(
            "/ships/{id}",
            get(fleet::get_ship)
                .put(fleet::update_ship)
                .delete(fleet::delete_ship),
        )
        .route(
            "/seat-types",
            get(fleet::list_seat_types).post(fleet::create_seat_type),
        )
        .route(
            "/seat-types/{id}",
            get(fleet::get_seat_type)
                .put(fleet::update_seat_type)
                .delete(fleet::delete_seat_type),
        )
        .route("/seats", get(fleet::list_seats).post(fleet::create_seat))
        .route(
            "/seats/{id}",
            get(fleet::get_seat)
                .put(fleet::update_seat)
                .delete(fleet::delete_seat),
        )
        .route(
            "/routes",
            get(network::list_routes).post(network::create_route),
        )
        .route(
            "/routes/{id}",
            get(network::get_route)
                .put(network::update_route)
                .delete(network::delete_route),
        )
        .route("/trips", get(network::list_trips).post(network::create_trip))
        .route(
            "/trips/{id}",
            get(network::get_trip)
                .put(network::update_trip)
                .delete(network::delete_trip),
        )
        .route(
            "/trip-seats",
            get(network::list_trip_seats).post(network::create_trip_seat),
        )
        .route(
            "/trip-seats/{id}",
            get(network::get_trip_seat).delete(network::delete_trip_seat),
        )
        .route(
            "/payment-methods",
            get(booking::list_payment_methods).post(booking::create_payment_method),
        )
        .route(
            "/payment-methods/{id}",
            get(booking::get_payment_method)
                .put(booking::update_payment_method)
                .delete(booking::delete_payment_method),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            write_auth_middleware,
        ));

    // Everything here requires an authenticated caller, reads included
    let protected_routes = Router::new()
        .route(
            "/notifications",
            get(notifications::list).post(notifications::create),
        )
        .route(
            "/notifications/{id}",
            get(notifications::get)
                .put(notifications::update)
                .delete(notifications::delete),
        )
        .route(
            "/user-companies",
            get(company::list_memberships).post(company::create_membership),
        )
        .route(
            "/user-companies/{id}",
            get(company::get_membership)
                .put(company::update_membership)
                .delete(company::delete_membership),
        )
        .route(
            "/bookings",
            get(booking::list_bookings).post(booking::create_booking),
        )
        .route(
            "/bookings/{id}",
            get(booking::get_booking).delete(booking::cancel_booking),
        )
        .route(
            "/payments",
            get(booking::list_payments).post(booking::create_payment),
        )
        .route("/payments/{id}", get(booking::get_payment))
        .layer(user_governor)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest(
            "/api",
            auth_routes.merge(directory_routes).merge(protected_routes),
        )
        .with_state(state)
}
