mod helpers;

mod flow_test;
mod router_test;
mod token_test;
mod usecase_test;
