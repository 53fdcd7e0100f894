pub mod excel_date;
