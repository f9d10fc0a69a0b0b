/// Asserts that at least one element of a vector matches the pattern (and optional guard),
/// running the success expression for every element that does.
macro_rules! assert_vec_contains {
    (@match $vector:expr, $pattern:pat if $cond:expr => $success:expr) => {
        let mut found = false;
        for x in $vector.iter() {
            match x {
                $pattern if $cond => {
                    found = true;
                    $success
                }
                _ => (),
            };
        }

        if !found {
            panic!(
                "None of the {} elements matched '{} if {}': {:?}",
                $vector.len(),
                stringify!($pattern),
                stringify!($cond),
                $vector
            )
        }
    };

    ($vector:expr, $pattern:pat if $cond:expr) => {
        assert_vec_contains!(@match $vector, $pattern if $cond => ());
    };

    ($vector:expr, $pattern:pat => $success:expr) => {
        assert_vec_contains!(@match $vector, $pattern if true => $success);
    };

    ($vector:expr, $pattern:pat if $cond:expr => $success:expr) => {
        assert_vec_contains!(@match $vector, $pattern if $cond => $success);
    };

    ($vector:expr, $pattern:pat) => {
        assert_vec_contains!(@match $vector, $pattern if true => ());
    };
}
