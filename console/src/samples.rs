//! Canned example queries over the demo schema.

/// A titled example query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleQuery {
    pub title: &'static str,
    pub query: &'static str,
}

pub const SAMPLE_QUERIES: &[SampleQuery] = &[
    SampleQuery {
        title: "Show all customers",
        query: "SELECT * FROM Customers;",
    },
    SampleQuery {
        title: "Show all orders",
        query: "SELECT * FROM Orders;",
    },
    SampleQuery {
        title: "Show all shippings",
        query: "SELECT * FROM Shippings;",
    },
    SampleQuery {
        title: "Join Customers with Orders",
        query: "SELECT Customers.first_name, Customers.last_name, Orders.item, Orders.amount
FROM Customers
JOIN Orders ON Customers.customer_id = Orders.customer_id;",
    },
    SampleQuery {
        title: "Join Customers with Shippings",
        query: "SELECT Customers.first_name, Customers.last_name, Shippings.status
FROM Customers
JOIN Shippings ON Customers.customer_id = Shippings.customer;",
    },
    SampleQuery {
        title: "Join all three tables",
        query: "SELECT Customers.first_name, Customers.last_name, Orders.item, Orders.amount, Shippings.status
FROM Customers
JOIN Orders ON Customers.customer_id = Orders.customer_id
JOIN Shippings ON Customers.customer_id = Shippings.customer;",
    },
    SampleQuery {
        title: "Count orders per customer",
        query: "SELECT Customers.first_name, COUNT(Orders.order_id) AS total_orders
FROM Customers
JOIN Orders ON Customers.customer_id = Orders.customer_id
GROUP BY Customers.first_name;",
    },
    SampleQuery {
        title: "Customers with no orders",
        query: "SELECT *
FROM Customers
LEFT JOIN Orders ON Customers.customer_id = Orders.customer_id
WHERE Orders.order_id IS NULL;",
    },
    SampleQuery {
        title: "Total amount spent by customer",
        query: "SELECT Customers.first_name, SUM(Orders.amount) AS total_spent
FROM Customers
JOIN Orders ON Customers.customer_id = Orders.customer_id
GROUP BY Customers.first_name;",
    },
    SampleQuery {
        title: "Delivered orders",
        query: "SELECT Orders.item, Orders.amount, Shippings.status
FROM Orders
JOIN Shippings ON Orders.customer_id = Shippings.customer
WHERE Shippings.status = 'Delivered';",
    },
];

/// Example by 1-based position, as listed to the user.
pub fn sample(number: usize) -> Option<&'static SampleQuery> {
    number.checked_sub(1).and_then(|i| SAMPLE_QUERIES.get(i))
}

/// Numbered listing of all examples.
pub fn listing() -> String {
    SAMPLE_QUERIES
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{:>2}. {}", i + 1, s.title))
        .collect::<Vec<_>>()
        .join("\n")
}
