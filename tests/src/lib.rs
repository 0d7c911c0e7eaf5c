#![cfg(test)]

mod common;

mod concurrency_tests;

mod lending_tests;

mod notification_tests;
