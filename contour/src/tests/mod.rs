// Value model tests
mod context_tests;
mod dimension_tests;


mod redefinition_tests;

// Parser tests
mod parser_tests;
